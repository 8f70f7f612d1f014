//! Print-readiness guardrail: DPI and safe-area evaluation.
//!
//! The guardrail gates the "continue" action between the design editor
//! and checkout. Evaluation is a pure, total function of the current
//! image/print geometry: malformed geometry degrades to a safe default
//! instead of erroring.

use serde::{Deserialize, Serialize};

/// Minimum DPI for a `Good` verdict.
pub const DPI_GOOD_MIN: f64 = 300.0;

/// DPI below this is a hard `Block`.
pub const DPI_BLOCK_BELOW: f64 = 180.0;

/// Print-resolution verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DpiStatus {
    /// At or above 300 DPI.
    Good,
    /// Between 180 and 300 DPI, or resolution unknown.
    Warn,
    /// Below 180 DPI, or the artifact is known to have no pixels.
    Block,
}

/// Severity tone attached to a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Everything is fine.
    Positive,
    /// Proceed with awareness.
    Caution,
    /// Progression is blocked.
    Critical,
}

/// A user-facing message with a severity tone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailMessage {
    /// Severity tone for presentation.
    pub tone: Tone,
    /// Short headline.
    pub title: String,
    /// One-sentence detail.
    pub detail: String,
}

impl GuardrailMessage {
    fn new(tone: Tone, title: &str, detail: &str) -> Self {
        Self {
            tone,
            title: title.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Geometry and collision snapshot for one evaluation.
///
/// Ephemeral: recomputed per evaluation, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardrailInput {
    /// Uploaded image width in pixels.
    pub image_width: f64,
    /// Uploaded image height in pixels.
    pub image_height: f64,
    /// Target print width in inches.
    pub target_print_width_in: f64,
    /// Target print height in inches.
    pub target_print_height_in: f64,
    /// Whether any design element crosses the print-safe area.
    pub safe_area_collisions: bool,
}

/// Result of a guardrail evaluation.
///
/// The resolution and safe-area messages are independent and surfaced
/// simultaneously, never merged into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailState {
    /// Print-resolution verdict.
    pub dpi_status: DpiStatus,
    /// Effective DPI at the selected print size, when computable.
    pub effective_dpi: Option<f64>,
    /// Safe-area collision flag echoed from the input.
    pub safe_area_collisions: bool,
    /// Whether the funnel may proceed to checkout.
    pub allow_proceed: bool,
    /// Resolution message.
    pub resolution: GuardrailMessage,
    /// Safe-area message.
    pub safe_area: GuardrailMessage,
}

impl GuardrailState {
    /// State shown before any artifact has been uploaded.
    ///
    /// Browsing is not blocked before upload: warn tone, proceed allowed.
    pub fn unevaluated() -> Self {
        Self {
            dpi_status: DpiStatus::Warn,
            effective_dpi: None,
            safe_area_collisions: false,
            allow_proceed: true,
            resolution: GuardrailMessage::new(
                Tone::Caution,
                "No design yet",
                "Upload artwork to check print quality.",
            ),
            safe_area: safe_area_message(false),
        }
    }
}

/// Compute the effective DPI at the selected print size.
///
/// Returns `None` when any dimension is non-finite or not positive.
pub fn effective_dpi(input: &GuardrailInput) -> Option<f64> {
    let dims = [
        input.image_width,
        input.image_height,
        input.target_print_width_in,
        input.target_print_height_in,
    ];
    if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return None;
    }
    let horizontal = input.image_width / input.target_print_width_in;
    let vertical = input.image_height / input.target_print_height_in;
    Some(horizontal.min(vertical))
}

/// Evaluate print readiness from the current geometry and collisions.
pub fn evaluate(input: &GuardrailInput) -> GuardrailState {
    let dpi = effective_dpi(input);

    let dpi_status = match dpi {
        Some(d) if d >= DPI_GOOD_MIN => DpiStatus::Good,
        Some(d) if d >= DPI_BLOCK_BELOW => DpiStatus::Warn,
        Some(_) => DpiStatus::Block,
        // Unknown is not failure; only an artifact known to have zero
        // pixels blocks.
        None if is_explicit_zero_geometry(input) => DpiStatus::Block,
        None => DpiStatus::Warn,
    };

    let allow_proceed = dpi_status != DpiStatus::Block && !input.safe_area_collisions;

    GuardrailState {
        dpi_status,
        effective_dpi: dpi,
        safe_area_collisions: input.safe_area_collisions,
        allow_proceed,
        resolution: resolution_message(dpi_status),
        safe_area: safe_area_message(input.safe_area_collisions),
    }
}

/// The artifact is known to have no pixels: all inputs are finite, the
/// print targets are positive, and an image dimension is exactly zero.
fn is_explicit_zero_geometry(input: &GuardrailInput) -> bool {
    let all_finite = [
        input.image_width,
        input.image_height,
        input.target_print_width_in,
        input.target_print_height_in,
    ]
    .iter()
    .all(|d| d.is_finite());

    all_finite
        && input.target_print_width_in > 0.0
        && input.target_print_height_in > 0.0
        && (input.image_width == 0.0 || input.image_height == 0.0)
}

fn resolution_message(status: DpiStatus) -> GuardrailMessage {
    match status {
        DpiStatus::Good => GuardrailMessage::new(
            Tone::Positive,
            "High resolution",
            "Your image is at least 300 DPI and will print sharply.",
        ),
        DpiStatus::Warn => GuardrailMessage::new(
            Tone::Caution,
            "Medium resolution",
            "Printing may appear slightly soft at this size; a larger image will look better.",
        ),
        DpiStatus::Block => GuardrailMessage::new(
            Tone::Critical,
            "Resolution too low",
            "Your image is below 180 DPI at this size. Upload a larger image to continue.",
        ),
    }
}

fn safe_area_message(collisions: bool) -> GuardrailMessage {
    if collisions {
        GuardrailMessage::new(
            Tone::Critical,
            "Outside safe area",
            "Part of your design crosses the trim zone and may be cut off.",
        )
    } else {
        GuardrailMessage::new(
            Tone::Positive,
            "Inside safe area",
            "Your design sits within the printable area.",
        )
    }
}
