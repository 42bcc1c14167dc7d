//! Boundary request execution.

use log::{debug, error};

use super::Workflow;
use crate::{
    boundary::{Command, Request, Response},
    error::Result,
    session::Session,
};

impl Workflow {
    /// Executes one decoded request. Failures come back as
    /// [`Response::Error`]; internal errors are logged with full context
    /// and reported generically.
    pub async fn dispatch(&self, request: Request) -> Response {
        let Request { caller, command } = request;
        let action = command.action();
        debug!("Dispatching '{action}' for {}", caller.user_id);

        match self.execute(&caller, command).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_internal() {
                    error!("'{action}' failed for {}: {e:?}", caller.user_id);
                } else {
                    debug!("'{action}' rejected: {e}");
                }
                Response::from(&e)
            }
        }
    }

    /// Decodes a JSON request, executes it and encodes the response.
    pub async fn dispatch_json(&self, raw: &str) -> String {
        let response = match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Response::invalid_request(format!("Malformed request: {e}")),
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            error!("Failed to encode response: {e}");
            r#"{"type":"error","data":{"code":"internal","message":"An unexpected error occurred. The incident has been logged.","recoverable":false}}"#.to_string()
        })
    }

    async fn execute(&self, caller: &Session, command: Command) -> Result<Response> {
        let response = match command {
            Command::StartIntervention(params) => {
                Response::Intervention(self.start_intervention(caller, &params).await?)
            }
            Command::GetIntervention(params) => {
                Response::Intervention(self.get_intervention(caller, params.intervention_id).await?)
            }
            Command::ListInterventions(params) => {
                Response::Interventions(self.list_interventions(caller, &params).await?)
            }
            Command::Progress(params) => Response::Progress(self.progress(caller, params.intervention_id).await?),
            Command::CurrentStep(params) => Response::CurrentStep {
                step: self.current_step(caller, params.intervention_id).await?,
            },
            Command::CanAccessStep(params) => Response::Access {
                step: params.step_type,
                allowed: self.can_access_step(caller, &params).await?,
            },
            Command::BeginStep(params) => Response::Step(self.begin_step(caller, &params).await?),
            Command::SaveDraft(params) => Response::DraftSaved(self.save_draft(caller, &params).await?),
            Command::AdvanceStep(params) => Response::StepAdvanced(self.advance_to_step(caller, &params).await?),
            Command::ApproveStep(params) => Response::Step(self.approve_step(caller, &params).await?),
            Command::Finalize(params) => Response::Finalized(self.finalize(caller, &params).await?),
            Command::CapturePhoto(params) => Response::PhotoAttached(self.capture_photo(caller, &params).await?),
            Command::RetryUpload(params) => Response::PhotoAttached(self.retry_upload(caller, &params).await?),
            Command::AcknowledgeUpload(params) => Response::Upload(self.acknowledge_upload(caller, &params).await?),
            Command::ListUploads => Response::Uploads(self.upload_items(caller).await?),
            Command::StepPhotos(params) => Response::Photos(self.step_photos(caller, &params).await?),
        };
        Ok(response)
    }
}
