//! Caption burn-in: compiles captions into timed `drawtext` overlays.
//!
//! Overlay coordinates are relative to the output frame, so these filters
//! must come after the crop/scale stage in the graph (see
//! [`compose_filter_graph`]).

use std::fmt;

use reelcut_project_model::caption::Caption;

/// Border drawn around caption glyphs for legibility on any background.
const BORDER_WIDTH: u32 = 2;
const BORDER_COLOR: &str = "black@0.8";

/// Replaces `'`, which would close the quoted `text` option.
const APOSTROPHE_SUBSTITUTE: char = '\u{2019}';

/// One timed text overlay.
///
/// Visibility times are in segment-local seconds and the caption is shown
/// for `visible_from <= t < visible_until`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawTextFilter {
    /// Caption text, already escaped for the filter language.
    pub text: String,
    pub x: String,
    pub y: String,
    pub font_size: f64,
    pub color: String,
    pub visible_from: f64,
    pub visible_until: f64,
}

impl fmt::Display for DrawTextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "drawtext=text='{text}':expansion=none:x={x}:y={y}:fontsize={size}\
             :fontcolor={color}:borderw={BORDER_WIDTH}:bordercolor={BORDER_COLOR}\
             :enable='gte(t,{from:.3})*lt(t,{until:.3})'",
            text = self.text,
            x = self.x,
            y = self.y,
            size = self.font_size,
            color = self.color,
            from = self.visible_from,
            until = self.visible_until,
        )
    }
}

/// Compile captions into overlays for a segment that starts at
/// `time_offset` seconds of the source.
///
/// Times are rounded to the millisecond they are emitted with. Captions
/// whose rounded end is at or before the segment start are dropped. A
/// caption already on screen when the segment starts is clamped to `0`. The
/// end is left as-is even when it runs past the segment; the segment's own
/// duration cuts it off.
pub fn compile_caption_filters(captions: &[Caption], time_offset: f64) -> Vec<DrawTextFilter> {
    captions
        .iter()
        .filter_map(|caption| {
            let local_end = round_millis(caption.end_time - time_offset);
            if local_end <= 0.0 {
                return None;
            }
            let local_start = round_millis((caption.start_time - time_offset).max(0.0));
            let style = caption.resolved_style();

            Some(DrawTextFilter {
                text: escape_drawtext(&caption.text),
                x: style.x,
                y: style.y,
                font_size: style.font_size,
                color: style.color,
                visible_from: local_start,
                visible_until: local_end,
            })
        })
        .collect()
}

fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Escape caption text for the quoted `text` option of `drawtext`.
///
/// Order matters: backslashes are doubled first so the escapes added for
/// the other characters are not themselves doubled. `%` needs no escape
/// because overlays are emitted with `expansion=none`.
pub fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push(APOSTROPHE_SUBSTITUTE),
            ':' | ',' | '[' | ']' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Crop to the output aspect ratio anchored on source height, then scale to
/// the output size.
pub fn crop_and_scale(width: u32, height: u32) -> String {
    let divisor = gcd(width.max(1), height.max(1));
    format!(
        "crop=ih*{num}/{den}:ih,scale={width}:{height}",
        num = width.max(1) / divisor,
        den = height.max(1) / divisor,
    )
}

/// Chain the frame transform and the overlays into one `-vf` graph.
pub fn compose_filter_graph(transform: &str, overlays: &[DrawTextFilter]) -> String {
    let mut graph = String::from(transform);
    for overlay in overlays {
        graph.push(',');
        graph.push_str(&overlay.to_string());
    }
    graph
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}
