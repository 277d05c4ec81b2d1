//! Turn loop: drives one conversation turn from an event stream to the
//! renderer, racing the stream against Ctrl+C.

use std::pin::Pin;

use anyhow::Result;
use futures_util::{Stream, StreamExt};

use crate::events::{AgentEvent, EventKind};
use crate::interrupt;
use crate::render::TurnRenderer;

/// How a turn finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Interrupted,
}

/// Boundary to the agent engine: given a query, produce the event
/// stream for one turn. Implementations live with the host.
pub trait Agent: Send + Sync {
    fn run(
        &self,
        query: &str,
        user_id: &str,
        conversation_id: &str,
    ) -> Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;
}

/// Consumes one turn's events, rendering each as it arrives.
///
/// A Ctrl+C between events wins the race: the renderer gets a synthetic
/// interrupt event (clearing indicators and flushing buffered text) and
/// the remaining stream is dropped. Stream exhaustion without an `end`
/// event is treated as an implicit end so the terminal is never left
/// mid-line.
pub async fn run_turn<S>(mut events: S, renderer: &mut TurnRenderer) -> Result<TurnOutcome>
where
    S: Stream<Item = AgentEvent> + Unpin,
{
    loop {
        tokio::select! {
            () = interrupt::wait_for_interrupt() => {
                renderer
                    .handle_event(AgentEvent::new(EventKind::Interrupt, ""))
                    .await;
                interrupt::reset();
                return Ok(TurnOutcome::Interrupted);
            }
            next = events.next() => match next {
                Some(event) => {
                    let done = event.kind == EventKind::End;
                    renderer.handle_event(event).await;
                    if done {
                        return Ok(TurnOutcome::Completed);
                    }
                }
                None => {
                    renderer.handle_event(AgentEvent::new(EventKind::End, "")).await;
                    return Ok(TurnOutcome::Completed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("sink lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn contents(sink: &SharedSink) -> String {
        String::from_utf8_lossy(&sink.0.lock().expect("sink lock")).into_owned()
    }

    #[tokio::test]
    async fn test_turn_completes_on_end_event() {
        let sink = SharedSink::default();
        let mut renderer = TurnRenderer::with_sink(Box::new(sink.clone()), false);
        let events = futures_util::stream::iter(vec![
            AgentEvent::new(EventKind::Respond, "hello\n"),
            AgentEvent::new(EventKind::End, ""),
            AgentEvent::new(EventKind::Respond, "never rendered\n"),
        ]);

        let outcome = run_turn(events, &mut renderer).await.expect("turn");
        assert_eq!(outcome, TurnOutcome::Completed);
        let out = contents(&sink);
        assert!(out.contains("hello"));
        assert!(!out.contains("never rendered"), "loop stops at end");
    }

    #[tokio::test]
    async fn test_exhausted_stream_is_implicit_end() {
        let sink = SharedSink::default();
        let mut renderer = TurnRenderer::with_sink(Box::new(sink.clone()), false);
        let events =
            futures_util::stream::iter(vec![AgentEvent::new(EventKind::Respond, "tail text")]);

        let outcome = run_turn(events, &mut renderer).await.expect("turn");
        assert_eq!(outcome, TurnOutcome::Completed);
        let out = contents(&sink);
        assert!(out.contains("tail text"), "buffered text flushed at implicit end");
        assert!(out.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn test_interrupt_wins_over_pending_stream() {
        let sink = SharedSink::default();
        let mut renderer = TurnRenderer::with_sink(Box::new(sink.clone()), false);
        // A stream that never yields: only the interrupt can finish it.
        let events = futures_util::stream::pending::<AgentEvent>();
        tokio::pin!(events);

        interrupt::trigger();
        let outcome = run_turn(&mut events, &mut renderer).await.expect("turn");
        assert_eq!(outcome, TurnOutcome::Interrupted);
        assert!(contents(&sink).contains("interrupted"));
        assert!(!interrupt::is_interrupted(), "flag reset for the next turn");
    }
}
