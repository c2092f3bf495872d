//! Runtime platform detection.

use widget_host::Platform;

/// Classifies the environment from the presence of the first-host global.
///
/// Detection never produces [`Platform::Mcp`]; that classification is only
/// confirmed later by a successful handshake.
pub const fn classify(has_openai_global: bool) -> Platform {
    if has_openai_global {
        Platform::OpenAi
    } else {
        Platform::Unknown
    }
}

/// Inspects the ambient environment once and classifies it.
///
/// Pure read of the global scope: no side effects, no I/O. Non-wasm builds
/// always report the global as absent.
pub fn detect_platform() -> Platform {
    classify(crate::openai_web::openai_global_present())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_global_classifies_as_openai() {
        assert_eq!(classify(true), Platform::OpenAi);
    }

    #[test]
    fn absent_global_is_provisionally_unknown() {
        assert_eq!(classify(false), Platform::Unknown);
    }

    #[test]
    fn non_wasm_detection_reports_unknown() {
        assert_eq!(detect_platform(), Platform::Unknown);
    }
}
