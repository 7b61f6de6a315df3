// src/protocol.rs
// Protocol messages emitted while a spec runs, streamed through a Channel

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::warn;

use crate::channel::{Channel, Sender};
use crate::error::{InertionError, Result};
use crate::harness::{execute, Test};
use crate::tester::Record;
use crate::types::{serialize_error, serialize_millis, Check, SpecError};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Message {
    TestStarted {
        description: String,
    },
    Asserted {
        check: Check,
    },
    TestEnded {
        #[serde(serialize_with = "serialize_millis")]
        time: Duration,
        #[serde(
            skip_serializing_if = "Option::is_none",
            serialize_with = "serialize_error"
        )]
        error: Option<SpecError>,
    },
}

/// Run a test's spec, emitting its messages as a lazily consumed stream
///
/// Assertions are forwarded as `Asserted` messages the moment they fire.
/// Forwarding closes as soon as the spec settles, before `TestEnded` is
/// emitted; a later assertion fails with `AssertionAfterEnd` naming the test.
pub fn run_spec<C: Send + 'static>(test: &Test<C>) -> Channel<Message> {
    let test = test.clone();

    Channel::new(move |sender: Sender<Message>| async move {
        let description = test.description().to_string();
        emit(
            &sender,
            Message::TestStarted {
                description: description.clone(),
            },
        );

        let forwarder = Arc::new(Forwarder::new(description, sender.clone()));
        let record: Record = {
            let forwarder = forwarder.clone();
            Arc::new(move |check| forwarder.forward(check))
        };

        let (time, error) = execute(&test, record).await;
        forwarder.close();

        emit(&sender, Message::TestEnded { time, error });
    })
}

// Open while it holds a sender, closed once the sender is taken
struct Forwarder {
    description: String,
    sender: Mutex<Option<Sender<Message>>>,
}

impl Forwarder {
    fn new(description: String, sender: Sender<Message>) -> Self {
        Self {
            description,
            sender: Mutex::new(Some(sender)),
        }
    }

    fn forward(&self, check: Check) -> Result<()> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match &*sender {
            Some(sender) => sender.push(Message::Asserted { check }),
            None => Err(InertionError::AssertionAfterEnd {
                description: self.description.clone(),
            }),
        }
    }

    fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

fn emit(sender: &Sender<Message>, message: Message) {
    if let Err(err) = sender.push(message) {
        warn!(error = %err, "dropped protocol message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::{standard, Is};
    use crate::harness::setup;
    use crate::tester::Tester;
    use serde_json::json;
    use std::sync::OnceLock;
    use std::thread::JoinHandle;

    #[tokio::test]
    async fn test_messages_frame_the_assertions() {
        let mut suite = setup(standard());
        let test = suite.test("streamed", |is, _| async move {
            is.ok(true, "first");
            tokio::task::yield_now().await;
            is.equal(1, 2, "second");
            Ok(())
        });

        let messages = run_spec(&test).collect().await;
        assert_eq!(messages.len(), 4);
        assert!(matches!(
            &messages[0],
            Message::TestStarted { description } if description == "streamed"
        ));
        assert!(matches!(&messages[1], Message::Asserted { check } if check.fact.pass));
        assert!(matches!(&messages[2], Message::Asserted { check } if !check.fact.pass));
        assert!(matches!(&messages[3], Message::TestEnded { error: None, .. }));
    }

    #[tokio::test]
    async fn test_error_is_reported_in_test_ended() {
        let mut suite = setup(standard());
        let test = suite.test("fails", |_, _| async move { Err(anyhow::anyhow!("oh no")) });

        let messages = run_spec(&test).collect().await;
        match messages.last() {
            Some(Message::TestEnded { error: Some(err), .. }) => {
                assert_eq!(err.to_string(), "oh no")
            }
            other => panic!("unexpected last message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_leaked_tester_is_rejected_with_test_name() {
        let leaked: Arc<OnceLock<Tester>> = Arc::new(OnceLock::new());
        let mut suite = setup(standard());
        let slot = leaked.clone();
        let test = suite.test("leaks its tester", move |is, _| {
            let slot = slot.clone();
            async move {
                let _ = slot.set(is);
                Ok(())
            }
        });

        let messages = run_spec(&test).collect().await;
        assert_eq!(messages.len(), 2);

        let tester = leaked.get().unwrap();
        let err = tester.try_call("ok", &[json!(true)]).unwrap_err();
        assert!(matches!(
            err,
            InertionError::AssertionAfterEnd { ref description }
                if description == "leaks its tester"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_assertion_lands_after_test_ended() {
        for _ in 0..20 {
            let spinner: Arc<Mutex<Option<JoinHandle<InertionError>>>> = Arc::default();
            let mut suite = setup(standard());
            let slot = spinner.clone();
            let test = suite.test("spins", move |is, _| {
                let slot = slot.clone();
                async move {
                    let handle = std::thread::spawn(move || loop {
                        if let Err(err) = is.try_call("ok", &[json!(true)]) {
                            return err;
                        }
                    });
                    *slot.lock().unwrap() = Some(handle);
                    Ok(())
                }
            });

            let messages = run_spec(&test).collect().await;
            assert!(matches!(messages.last(), Some(Message::TestEnded { .. })));
            assert_eq!(
                messages
                    .iter()
                    .filter(|m| matches!(m, Message::TestEnded { .. }))
                    .count(),
                1
            );

            let handle = spinner.lock().unwrap().take().unwrap();
            let err = handle.join().unwrap();
            assert!(matches!(
                err,
                InertionError::AssertionAfterEnd { ref description } if description == "spins"
            ));
        }
    }

    #[tokio::test]
    async fn test_message_wire_shape() {
        let message = Message::TestStarted {
            description: "wire".to_string(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "TestStarted", "description": "wire" }));
    }
}
