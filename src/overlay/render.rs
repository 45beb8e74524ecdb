//! Overlay rendering.
//!
//! [`layer_for`] is the one place that looks at an overlay's variant; adding
//! a variant to [`OverlayContent`] fails to compile until it is handled
//! here. Layers compile to an ffmpeg `-filter_complex` graph so the overlay
//! set can be burned into the stream.

use std::fmt::Write as _;

use super::model::{Geometry, Overlay, OverlayContent, Palette};
use super::store::OverlayStore;

const CARD_BACKGROUND: &str = "111827";
const CARD_TEXT: &str = "FFFFFF";
const CARD_ALERT: &str = "EF4444";
const CARD_FONT_SIZE: u32 = 16;
const CARD_LINE_HEIGHT: f64 = 22.0;
const PADDING: f64 = 8.0;

/// One row of an alert card as drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLine {
    pub text: String,
    pub highlighted: bool,
}

/// What to draw for one overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerContent {
    Label { text: String, palette: Palette },
    Image { source: String },
    Card { lines: Vec<CardLine> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub overlay_id: String,
    pub z_index: i32,
    pub rect: Geometry,
    pub content: LayerContent,
}

/// Map an overlay to its drawable layer.
#[must_use]
pub fn layer_for(overlay: &Overlay) -> Layer {
    let content = match &overlay.content {
        OverlayContent::Text { text, style } => LayerContent::Label {
            text: text.clone(),
            palette: style.palette(),
        },
        OverlayContent::Image { image_url } => LayerContent::Image {
            source: image_url.clone(),
        },
        OverlayContent::AlertCard { data } => {
            let mut lines = vec![CardLine {
                text: data.title.clone(),
                highlighted: false,
            }];
            lines.extend(data.stats.iter().map(|stat| CardLine {
                text: format!("{}: {}", stat.label, stat.value),
                highlighted: stat.alert_flag,
            }));
            if !data.active_alert.is_empty() {
                lines.push(CardLine {
                    text: format!("! {}", data.active_alert),
                    highlighted: true,
                });
            }
            lines.push(CardLine {
                text: data.time.clone(),
                highlighted: false,
            });
            LayerContent::Card { lines }
        }
    };

    Layer {
        overlay_id: overlay.id.clone(),
        z_index: overlay.z_index,
        rect: overlay.geometry,
        content,
    }
}

/// Layers in paint order.
#[must_use]
pub fn compose(store: &OverlayStore) -> Vec<Layer> {
    store.render_order().into_iter().map(layer_for).collect()
}

/// An ffmpeg filter graph plus the extra inputs it references.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    /// Image inputs, to be passed as `-i` after the video input.
    pub inputs: Vec<String>,
    /// Value for `-filter_complex`; the result is labelled `[vout]`.
    pub filter: String,
}

impl FilterGraph {
    /// ffmpeg arguments for the inputs and filter (without the video input).
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.inputs.len() * 2 + 4);
        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.clone());
        }
        args.push("-filter_complex".to_string());
        args.push(self.filter.clone());
        args.push("-map".to_string());
        args.push("[vout]".to_string());
        args
    }

    /// Full ffmpeg argument list burning the overlays into `input`. Audio,
    /// when present, is copied; video is re-encoded.
    #[must_use]
    pub fn ffmpeg_args(&self, input: &str, output: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "warning", "-stats", "-i"]
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        args.push(input.to_string());
        args.extend(self.to_args());
        args.extend(
            ["-map", "0:a?", "-c:v", "libx264", "-preset", "veryfast", "-c:a", "copy", "-y"]
                .iter()
                .map(std::string::ToString::to_string),
        );
        args.push(output.to_string());
        args
    }
}

/// Compile layers (already in paint order) into one filter graph reading
/// video from input 0.
#[must_use]
pub fn filter_graph(layers: &[Layer]) -> FilterGraph {
    let mut inputs = Vec::new();
    let mut chains = Vec::new();
    let mut current = "[0:v]".to_string();

    for (idx, layer) in layers.iter().enumerate() {
        let out = if idx + 1 == layers.len() {
            "[vout]".to_string()
        } else {
            format!("[v{idx}]")
        };
        let r = layer.rect;
        let chain = match &layer.content {
            LayerContent::Label { text, palette } => {
                let size = label_font_size(r);
                format!(
                    "{current}{},{}{out}",
                    drawbox(r, palette.background, 1.0),
                    drawtext(
                        text,
                        palette.foreground,
                        size,
                        &centered_x(r),
                        r.y + (r.height - f64::from(size)) / 2.0
                    ),
                )
            }
            LayerContent::Image { source } => {
                inputs.push(source.clone());
                let input = inputs.len();
                format!(
                    "[{input}:v]scale={}:{}[img{idx}];{current}[img{idx}]overlay={}:{}{out}",
                    px(r.width),
                    px(r.height),
                    px(r.x),
                    px(r.y)
                )
            }
            LayerContent::Card { lines } => {
                let mut chain = format!("{current}{}", drawbox(r, CARD_BACKGROUND, 0.85));
                for (row, line) in lines.iter().enumerate() {
                    let color = if line.highlighted { CARD_ALERT } else { CARD_TEXT };
                    let y = r.y + PADDING + CARD_LINE_HEIGHT * row as f64;
                    if y + CARD_LINE_HEIGHT > r.y + r.height {
                        break;
                    }
                    let x = px(r.x + PADDING).to_string();
                    let _ = write!(
                        chain,
                        ",{}",
                        drawtext(&line.text, color, CARD_FONT_SIZE, &x, y)
                    );
                }
                chain.push_str(&out);
                chain
            }
        };
        chains.push(chain);
        current = out;
    }

    if chains.is_empty() {
        chains.push("[0:v]null[vout]".to_string());
    }

    FilterGraph {
        inputs,
        filter: chains.join(";"),
    }
}

fn drawbox(r: Geometry, color: &str, opacity: f64) -> String {
    format!(
        "drawbox=x={}:y={}:w={}:h={}:color=0x{color}@{opacity}:t=fill",
        px(r.x),
        px(r.y),
        px(r.width),
        px(r.height)
    )
}

/// `x_expr` may be an ffmpeg expression; `y` is a pixel offset.
fn drawtext(text: &str, color: &str, size: u32, x_expr: &str, y: f64) -> String {
    format!(
        "drawtext=text='{}':fontsize={size}:fontcolor=0x{color}:x={x_expr}:y={}",
        escape_text(text),
        px(y)
    )
}

fn centered_x(r: Geometry) -> String {
    format!("{}+({}-text_w)/2", px(r.x), px(r.width))
}

fn label_font_size(r: Geometry) -> u32 {
    // ~60% of the box height, bounded to stay legible
    (r.height * 0.6).clamp(10.0, 64.0) as u32
}

fn px(v: f64) -> i64 {
    v.round() as i64
}

/// Escape text for a quoted drawtext value.
fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace('%', "\\%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::model::{AlertCardData, NewOverlay, StatEntry, TextStyle};

    fn store() -> OverlayStore {
        let mut store = OverlayStore::new();
        store.upsert(
            NewOverlay::image("logo.png")
                .with_z_index(5)
                .into_overlay("img", "s1"),
        );
        store.upsert(
            NewOverlay::text("Missing Helmet", TextStyle::Alert)
                .with_z_index(1)
                .into_overlay("label", "s1"),
        );
        store
    }

    #[test]
    fn compose_follows_paint_order() {
        let layers = compose(&store());
        let ids: Vec<&str> = layers.iter().map(|l| l.overlay_id.as_str()).collect();
        assert_eq!(ids, vec!["label", "img"]);
    }

    #[test]
    fn text_layer_uses_style_palette() {
        let overlay = NewOverlay::text("LIVE", TextStyle::Live).into_overlay("o", "s1");
        let LayerContent::Label { palette, .. } = layer_for(&overlay).content else {
            panic!("expected label");
        };
        assert_eq!(palette.background, "22C55E");
    }

    #[test]
    fn card_layer_highlights_alert_rows() {
        let overlay = NewOverlay::alert_card(AlertCardData {
            title: "Classroom C8".to_string(),
            stats: vec![StatEntry {
                label: "Teachers".to_string(),
                value: "0/2".to_string(),
                alert_flag: true,
            }],
            active_alert: "Suspicious Behavior".to_string(),
            time: "01:25 am".to_string(),
        })
        .into_overlay("card", "s1");

        let LayerContent::Card { lines } = layer_for(&overlay).content else {
            panic!("expected card");
        };
        assert_eq!(lines[0].text, "Classroom C8");
        assert!(lines[1].highlighted);
        assert_eq!(lines[1].text, "Teachers: 0/2");
        assert_eq!(lines[2].text, "! Suspicious Behavior");
        assert_eq!(lines.last().unwrap().text, "01:25 am");
    }

    #[test]
    fn filter_graph_chains_layers() {
        let graph = filter_graph(&compose(&store()));
        assert_eq!(graph.inputs, vec!["logo.png".to_string()]);
        assert!(graph.filter.starts_with("[0:v]drawbox=x=20:y=20:w=120:h=40:color=0xEF4444"));
        assert!(graph.filter.contains("text='Missing Helmet'"));
        assert!(graph.filter.contains("[1:v]scale=80:80[img1];[v0][img1]overlay=20:20[vout]"));

        let args = graph.to_args();
        assert_eq!(args[0], "-i");
        assert_eq!(args.last().unwrap(), "[vout]");
    }

    #[test]
    fn ffmpeg_args_put_video_first() {
        let graph = filter_graph(&compose(&store()));
        let args = graph.ffmpeg_args("in.m3u8", "out.mp4");
        let inputs: Vec<&str> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(flag, _)| flag.as_str() == "-i")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(inputs, vec!["in.m3u8", "logo.png"]);
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn empty_graph_passes_video_through() {
        let graph = filter_graph(&[]);
        assert_eq!(graph.filter, "[0:v]null[vout]");
        assert!(graph.inputs.is_empty());
    }

    #[test]
    fn drawtext_escapes_colons() {
        let overlay = NewOverlay::text("Workers: 3", TextStyle::Safe).into_overlay("o", "s1");
        let graph = filter_graph(&[layer_for(&overlay)]);
        assert!(graph.filter.contains("Workers\\: 3"));
    }
}
