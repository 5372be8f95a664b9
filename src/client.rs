use std::sync::Arc;
use tokio::sync::mpsc;
use log::{debug, error, info};
use crate::AstraFoot;
use crate::tracker::RequestTracker;

/// Public API for the ASTRA-X backend - owns the task
pub struct AstraBackend
{   hand: crate::AstraHand
  , tracker: Arc<RequestTracker>
  , _task_handle: tokio::task::JoinHandle<()>
}

impl AstraBackend
{   /// Create and spawn a new backend over `tracker`.
    /// Returns immediately - spawns background task
    pub fn new(tracker: Arc<RequestTracker>) -> Self
    {   debug!("Creating AstraBackend with task ownership");

        let (generate_tx, generate_rx)
          = mpsc::unbounded_channel();
        let (get_state_tx, get_state_rx)
          = mpsc::unbounded_channel();
        let (get_model_lists_tx, get_model_lists_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::AstraHand
        {   generate_tx
          , get_state_tx
          , get_model_lists_tx
          , kill_process_tx
        };

        let foot = crate::AstraFoot
        {   generate_rx
          , get_state_rx
          , get_model_lists_rx
          , kill_process_rx
        };

        let loop_tracker = tracker.clone();
        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, loop_tracker).await
        });

        AstraBackend
        {   hand
          , tracker
          , _task_handle
        }
    }

    /// Queue a generation - returns almost immediately
    pub fn generate(
      &self
    , prompt: String
    , context: Option<String>
    , persona: crate::Persona
    , model: Option<String>
    ) -> crate::Result<mpsc::UnboundedReceiver<crate::GenerateReply>>
    {   debug!("generate queuing command for {}", persona.id());
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateArgs
        {   prompt
          , context
          , persona
          , model
          , reply: reply_tx
        };

        self.hand.generate_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::Error::Disconnected
          })?;

        Ok(reply_rx)
    }

    /// Query tracker state - returns almost immediately
    pub fn get_state(
      &self
    ) -> crate::Result<mpsc::UnboundedReceiver<crate::GetStateReply>>
    {   debug!("get_state queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.get_state_tx
          .send(crate::GetStateArgs { reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel closed");
            crate::Error::Disconnected
          })?;

        Ok(reply_rx)
    }

    /// Get model lists - returns almost immediately
    pub fn get_model_lists(
      &self
    ) -> crate::Result<mpsc::UnboundedReceiver<crate::GetModelListsReply>>
    {   debug!("get_model_lists queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.get_model_lists_tx
          .send(crate::GetModelListsArgs { reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel closed");
            crate::Error::Disconnected
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend.
    /// In-flight generations resolve to `Cancelled`.
    pub async fn shutdown(self) -> crate::Result<()>
    {   debug!("Shutting down AstraBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.hand.kill_process_tx
          .send(crate::KillProcessArgs { reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::Error::Disconnected
          })?;

        // Wait for shutdown confirmation
        match reply_rx.recv().await
        {   Some(result) => {
              debug!("Backend shutdown confirmed");
              result
            }
          , None => {
              error!("Backend exited without confirming shutdown");
              Err(crate::Error::Disconnected)
            }
        }
    }
}

impl Drop for AstraBackend
{   fn drop(&mut self)
    {   self.tracker.cancel();
    }
}

/// Main backend event loop
///
/// tokio::select! is ONLY for fast queueing. Each generation is
/// spawned as its own task so the loop never awaits on network work.
async fn run_backend_loop(
  foot: AstraFoot
, tracker: Arc<RequestTracker>
)
{   debug!("Starting AstraBackend event loop");
    let AstraFoot
    {   mut generate_rx
      , mut get_state_rx
      , mut get_model_lists_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_rx.recv() => {
          debug!("Received Generate for {}", cmd.persona.id());
          let tracker = tracker.clone();
          tokio::spawn(async move {
            let result = tracker
              .generate(
                &cmd.prompt,
                cmd.context.as_deref(),
                cmd.persona,
                cmd.model.as_deref()
              )
              .await;
            let _ = cmd.reply.send(result);
          });
        }
      , Some(cmd) = get_state_rx.recv() => {
          debug!("Received GetState");
          let _ = cmd.reply.send(Ok(tracker.state()));
        }
      , Some(cmd) = get_model_lists_rx.recv() => {
          debug!("Received GetModelLists");
          let _ = cmd.reply.send(Ok(crate::presets::available_models()));
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          tracker.cancel();
          let _ = cmd.reply.send(Ok(()));
          info!("AstraBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
