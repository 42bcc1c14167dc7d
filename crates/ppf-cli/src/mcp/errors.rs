//! Mapping of workflow errors to MCP errors.

use ppf_core::WorkflowError;
use rmcp::ErrorData;
use serde_json::json;

/// Rule violations the technician can fix become `invalid_params` carrying
/// the stable error code; everything else is an internal error with the
/// public message only.
pub fn to_mcp_error(context: &str, error: &WorkflowError) -> ErrorData {
    let data = Some(json!({
        "code": error.code(),
        "recoverable": error.is_recoverable(),
    }));
    if error.is_internal() {
        ErrorData::internal_error(format!("{context}: {}", error.public_message()), data)
    } else {
        ErrorData::invalid_params(format!("{context}: {}", error.public_message()), data)
    }
}

#[cfg(test)]
mod tests {
    use ppf_core::StepType;

    use super::*;

    #[test]
    fn test_rule_violation_is_invalid_params() {
        let error = WorkflowError::PhotoRequirementNotMet {
            step: StepType::Inspection,
            required: 4,
            actual: 1,
        };
        let mapped = to_mcp_error("Failed to complete step", &error);
        assert_eq!(mapped.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(mapped.message.contains("at least 4 photo"));
    }

    #[test]
    fn test_internal_error_hides_details() {
        let error = WorkflowError::Configuration {
            message: "invalid step status 'archived'".into(),
        };
        let mapped = to_mcp_error("Failed to load intervention", &error);
        assert_eq!(mapped.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
        assert!(!mapped.message.contains("archived"));
    }

    #[test]
    fn test_offline_keeps_message() {
        let mapped = to_mcp_error("Failed to capture photo", &WorkflowError::OfflineUploadUnavailable);
        assert!(mapped.message.ends_with("Upload photo indisponible hors ligne"));
    }
}
