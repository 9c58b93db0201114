use tracing::warn;

use super::types::{GenerationRequest, KlingInput};
use crate::consts::{DEFAULT_DURATION_SECS, KLING_MODE};
use crate::error::{AppError, AppResult};

/// Check the required fields and build the model input from them.
///
/// Only presence is checked. Prompt length and content are passed
/// through untouched.
pub fn into_kling_input(request: GenerationRequest) -> AppResult<KlingInput> {
    let prompt = non_empty(request.prompt).ok_or_else(|| {
        warn!("Video generation failed: No prompt provided");
        AppError::Validation("Prompt is required".to_string())
    })?;

    let image_url = non_empty(request.image_url).ok_or_else(|| {
        warn!("Video generation failed: No image URL provided");
        AppError::Validation("Image URL is required".to_string())
    })?;

    Ok(KlingInput {
        mode: KLING_MODE.to_string(),
        prompt,
        duration: request.duration.unwrap_or(DEFAULT_DURATION_SECS),
        start_image: image_url,
        negative_prompt: request.negative_prompt.unwrap_or_default(),
    })
}

/// Presence and scheme check for an image URL, no network access.
pub fn check_image_url_format(image_url: Option<&str>) -> AppResult<&str> {
    let image_url = image_url.filter(|url| !url.is_empty()).ok_or_else(|| {
        warn!("URL validation failed: No URL provided");
        AppError::Validation("Image URL is required".to_string())
    })?;

    if !(image_url.starts_with("http://") || image_url.starts_with("https://")) {
        warn!("URL validation failed: Invalid URL format - {image_url}");
        return Err(AppError::Format(
            "Please enter a valid URL starting with http:// or https://".to_string(),
        ));
    }

    Ok(image_url)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: Option<&str>, image_url: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.map(String::from),
            image_url: image_url.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_builds_wire_input_with_defaults() {
        let input = into_kling_input(request(
            Some("a cat surfing a wave"),
            Some("https://example.com/cat.png"),
        ))
        .unwrap();

        assert_eq!(
            input,
            KlingInput {
                mode: "standard".to_string(),
                prompt: "a cat surfing a wave".to_string(),
                duration: 5,
                start_image: "https://example.com/cat.png".to_string(),
                negative_prompt: String::new(),
            }
        );

        let wire = serde_json::to_value(&input).unwrap();
        let keys: Vec<&String> = wire.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 5);
        assert_eq!(wire["start_image"], "https://example.com/cat.png");
    }

    #[test]
    fn test_keeps_optional_fields() {
        let mut req = request(Some("sunset"), Some("http://example.com/a.jpg"));
        req.duration = Some(10);
        req.negative_prompt = Some("blurry".to_string());

        let input = into_kling_input(req).unwrap();
        assert_eq!(input.duration, 10);
        assert_eq!(input.negative_prompt, "blurry");
    }

    #[test]
    fn test_missing_prompt() {
        for prompt in [None, Some("")] {
            let err = into_kling_input(request(prompt, Some("https://example.com/a.png")))
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(ref m) if m == "Prompt is required"));
        }
    }

    #[test]
    fn test_missing_image_url() {
        let err = into_kling_input(request(Some("a dog"), None)).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Image URL is required"));
    }

    #[test]
    fn test_prompt_checked_first() {
        let err = into_kling_input(request(None, None)).unwrap_err();
        assert_eq!(err.to_string(), "Prompt is required");
    }

    #[test]
    fn test_image_url_format() {
        assert_eq!(
            check_image_url_format(Some("https://example.com/a.png")).unwrap(),
            "https://example.com/a.png"
        );
        assert!(check_image_url_format(Some("http://example.com/a.png")).is_ok());

        assert!(matches!(
            check_image_url_format(None),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            check_image_url_format(Some("")),
            Err(AppError::Validation(_))
        ));
        for bad in ["ftp://example.com/a.png", "example.com/a.png", "HTTPS://x"] {
            assert!(matches!(
                check_image_url_format(Some(bad)),
                Err(AppError::Format(_))
            ));
        }
    }
}
