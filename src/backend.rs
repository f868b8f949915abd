//! The seam between a chat session and the agent that answers it.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;

use crate::{AgentEvent, Result, RunAgentInput};

/// A stream of decoded events for one run.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send>>;

/// An agent that can run one conversational turn.
///
/// Implementations send `input` to the agent and return its events in the
/// order the agent produced them.  An `Err` from `run` itself means the run
/// never started; errors inside the stream mean it started and then failed or
/// produced an undecodable event.
///
/// # Example
///
/// ```
/// use aula::{AgentBackend, AgentEvent, EventStream, Result, RunAgentInput};
///
/// struct Canned;
///
/// #[async_trait::async_trait]
/// impl AgentBackend for Canned {
///     async fn run(&self, input: RunAgentInput) -> Result<EventStream> {
///         let done = AgentEvent::RunFinished {
///             thread_id: input.thread_id,
///             run_id: input.run_id,
///             result: None,
///         };
///         Ok(Box::pin(futures::stream::iter(vec![Ok(done)])))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// use futures::StreamExt;
/// let input = RunAgentInput::new("thread", "run", vec![], vec![]);
/// let events: Vec<_> = Canned.run(input).await.unwrap().collect().await;
/// assert!(events[0].as_ref().unwrap().is_terminal());
/// # });
/// ```
#[async_trait::async_trait]
pub trait AgentBackend: Send + Sync {
    /// Starts a run.
    async fn run(&self, input: RunAgentInput) -> Result<EventStream>;
}

#[async_trait::async_trait]
impl<B: AgentBackend + ?Sized> AgentBackend for Arc<B> {
    async fn run(&self, input: RunAgentInput) -> Result<EventStream> {
        (**self).run(input).await
    }
}
