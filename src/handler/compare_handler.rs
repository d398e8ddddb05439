use axum::extract::State;
use axum::{debug_handler, Json};
use ecs_logger::extra_fields;
use http::{HeaderMap, StatusCode};
use log::info;

use crate::error::errors::Error;
use crate::logger::logger::LoggerExtraFields;
use crate::models::compare_model::{CompareInput, CompareRequest, CompareResultOutput};
use crate::response::common_response::{GeneralResponseBuilder, GeneralResponseResult};
use crate::state::compare_state::CompareState;

#[debug_handler(state = CompareState)]
pub async fn compare_faces(
    headers: HeaderMap,
    State(state): State<CompareState>,
    payload: Option<Json<CompareRequest>>,
) -> GeneralResponseResult<CompareResultOutput> {
    let request_id = headers
        .get("x-request-id")
        .and_then(|header| header.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let _ = extra_fields::set_extra_fields(LoggerExtraFields {
        request_id: request_id.clone(),
    });

    info!("received face comparison request");

    // Extra fields outlive the request unless cleared; error paths must
    // clear them too, so all exits funnel through this single point.
    let result = handle_compare(&state, payload);
    if result.is_ok() {
        info!("completed face comparison");
    }
    extra_fields::clear_extra_fields();
    result
}

fn handle_compare(
    state: &CompareState,
    payload: Option<Json<CompareRequest>>,
) -> GeneralResponseResult<CompareResultOutput> {
    let Some(Json(payload)) = payload else {
        return Err(Error::bad_request("Missing image data"));
    };
    let (Some(image1), Some(image2)) = (payload.image1, payload.image2) else {
        return Err(Error::bad_request("Missing image data"));
    };

    let result = state
        .compare_service
        .compare_faces(CompareInput { image1, image2 })?;

    Ok(GeneralResponseBuilder::new()
        .status_code(StatusCode::OK)
        .body(result)
        .build())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pipeline::comparison_pipeline::comparison_pipeline::{CompareError, FaceComparer};

    struct StubComparer {
        result: fn() -> Result<f32, CompareError>,
    }

    impl FaceComparer for StubComparer {
        fn compare(&self, _image1: &str, _image2: &str) -> Result<f32, CompareError> {
            (self.result)()
        }
    }

    fn state(result: fn() -> Result<f32, CompareError>) -> CompareState {
        let pipeline: Arc<dyn FaceComparer> = Arc::new(StubComparer { result });
        CompareState::new(&pipeline)
    }

    fn request(image1: Option<&str>, image2: Option<&str>) -> Option<Json<CompareRequest>> {
        Some(Json(CompareRequest {
            image1: image1.map(str::to_string),
            image2: image2.map(str::to_string),
        }))
    }

    #[test]
    fn test_missing_payload_rejected() {
        let err = handle_compare(&state(|| Ok(1.0)), None).unwrap_err();
        assert_eq!(err.to_string(), "Missing image data");
    }

    #[test]
    fn test_missing_image_field_rejected() {
        let err = handle_compare(&state(|| Ok(1.0)), request(Some("aGVsbG8="), None)).unwrap_err();
        assert_eq!(err.to_string(), "Missing image data");
    }

    #[test]
    fn test_complete_payload_compared() {
        let response = handle_compare(
            &state(|| Ok(0.87654)),
            request(Some("aGVsbG8="), Some("d29ybGQ=")),
        )
        .unwrap();

        assert_eq!(response.status_code, StatusCode::OK);
        assert_eq!(response.data.expect("response body").similarity, 87.65);
    }
}
