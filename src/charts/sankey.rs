//! Sankey flow diagram: origins on the left, destinations on the right,
//! band thickness proportional to shipped volume.

use crate::charts::plotter::PALETTE;
use crate::stats::FlowLink;
use egui::epaint::CubicBezierShape;
use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke};
use std::collections::BTreeMap;

const NODE_WIDTH: f32 = 14.0;
const NODE_GAP: f32 = 10.0;
const LABEL_PAD: f32 = 6.0;

/// One column entry, positioned relative to the top of the diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct SankeyNode {
    pub label: String,
    pub volume: u64,
    pub top: f32,
    pub height: f32,
}

/// A flow between a left and a right node.
#[derive(Debug, Clone, PartialEq)]
pub struct SankeyBand {
    pub source: usize,
    pub target: usize,
    pub volume: u64,
    /// Top edge of the band where it leaves the source node.
    pub source_top: f32,
    /// Top edge of the band where it enters the target node.
    pub target_top: f32,
    pub thickness: f32,
}

/// Summed node volume. `total` saturates for display, `weight` drives the scale.
#[derive(Debug, Default)]
struct Volume {
    total: u64,
    weight: f64,
}

impl Volume {
    fn add(&mut self, volume: u64) {
        self.total = self.total.saturating_add(volume);
        self.weight += volume as f64;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SankeyLayout {
    pub sources: Vec<SankeyNode>,
    pub targets: Vec<SankeyNode>,
    pub bands: Vec<SankeyBand>,
}

impl SankeyLayout {
    /// Lay out flows into a column of the given pixel height.
    pub fn compute(flows: &[FlowLink], height: f32, gap: f32) -> Self {
        let flows: Vec<&FlowLink> = flows.iter().filter(|f| f.volume > 0).collect();
        if flows.is_empty() || height <= 0.0 {
            return Self::default();
        }

        let mut source_volume: BTreeMap<&str, Volume> = BTreeMap::new();
        let mut target_volume: BTreeMap<&str, Volume> = BTreeMap::new();
        for flow in &flows {
            source_volume.entry(flow.origin.as_str()).or_default().add(flow.volume);
            target_volume.entry(flow.destination.as_str()).or_default().add(flow.volume);
        }

        let total: f64 = flows.iter().map(|f| f.volume as f64).sum();
        let columns = source_volume.len().max(target_volume.len());
        let usable = (height - gap * (columns as f32 - 1.0)).max(height * 0.5);
        let scale = f64::from(usable) / total;

        let stack = |volumes: &BTreeMap<&str, Volume>| -> Vec<SankeyNode> {
            let mut top = 0.0;
            volumes
                .iter()
                .map(|(label, volume)| {
                    let node = SankeyNode {
                        label: label.to_string(),
                        volume: volume.total,
                        top,
                        height: (volume.weight * scale) as f32,
                    };
                    top += node.height + gap;
                    node
                })
                .collect()
        };
        let sources = stack(&source_volume);
        let targets = stack(&target_volume);

        let index = |nodes: &[SankeyNode], label: &str| nodes.iter().position(|n| n.label == label);
        let mut source_cursor: Vec<f32> = sources.iter().map(|n| n.top).collect();
        let mut target_cursor: Vec<f32> = targets.iter().map(|n| n.top).collect();

        let mut bands = Vec::with_capacity(flows.len());
        for flow in flows {
            let (Some(source), Some(target)) = (
                index(&sources, &flow.origin),
                index(&targets, &flow.destination),
            ) else {
                continue;
            };
            let thickness = (flow.volume as f64 * scale) as f32;
            bands.push(SankeyBand {
                source,
                target,
                volume: flow.volume,
                source_top: source_cursor[source],
                target_top: target_cursor[target],
                thickness,
            });
            source_cursor[source] += thickness;
            target_cursor[target] += thickness;
        }

        Self {
            sources,
            targets,
            bands,
        }
    }

    /// Height actually used by the taller column.
    pub fn extent(&self) -> f32 {
        self.sources
            .iter()
            .chain(self.targets.iter())
            .map(|n| n.top + n.height)
            .fold(0.0, f32::max)
    }
}

/// Draw the Sankey diagram into the available width.
pub fn draw_sankey(ui: &mut egui::Ui, flows: &[FlowLink], height: f32) {
    let width = ui.available_width();
    let (response, painter) = ui.allocate_painter(egui::vec2(width, height), Sense::hover());
    let rect = response.rect;

    let layout = SankeyLayout::compute(flows, rect.height(), NODE_GAP);
    if layout.bands.is_empty() {
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            "No flows",
            FontId::proportional(14.0),
            ui.visuals().weak_text_color(),
        );
        return;
    }

    // Leave room for labels on both sides.
    let label_room = (width * 0.18).min(140.0);
    let left_x = rect.left() + label_room;
    let right_x = rect.right() - label_room - NODE_WIDTH;
    let text_color = ui.visuals().text_color();

    for band in &layout.bands {
        let color = PALETTE[band.source % PALETTE.len()].gamma_multiply(0.45);
        let y0 = rect.top() + band.source_top + band.thickness / 2.0;
        let y1 = rect.top() + band.target_top + band.thickness / 2.0;
        let x0 = left_x + NODE_WIDTH;
        let x1 = right_x;
        let mid = (x0 + x1) / 2.0;
        let points = [
            Pos2::new(x0, y0),
            Pos2::new(mid, y0),
            Pos2::new(mid, y1),
            Pos2::new(x1, y1),
        ];
        painter.add(CubicBezierShape::from_points_stroke(
            points,
            false,
            Color32::TRANSPARENT,
            Stroke::new(band.thickness.max(1.0), color),
        ));
    }

    for (i, node) in layout.sources.iter().enumerate() {
        let node_rect = Rect::from_min_size(
            Pos2::new(left_x, rect.top() + node.top),
            egui::vec2(NODE_WIDTH, node.height.max(1.0)),
        );
        painter.rect_filled(node_rect, 2.0, PALETTE[i % PALETTE.len()]);
        painter.text(
            Pos2::new(left_x - LABEL_PAD, node_rect.center().y),
            Align2::RIGHT_CENTER,
            format!("{} ({})", node.label, node.volume),
            FontId::proportional(12.0),
            text_color,
        );
    }

    for node in &layout.targets {
        let node_rect = Rect::from_min_size(
            Pos2::new(right_x, rect.top() + node.top),
            egui::vec2(NODE_WIDTH, node.height.max(1.0)),
        );
        painter.rect_filled(node_rect, 2.0, Color32::from_rgb(96, 125, 139));
        painter.text(
            Pos2::new(right_x + NODE_WIDTH + LABEL_PAD, node_rect.center().y),
            Align2::LEFT_CENTER,
            format!("{} ({})", node.label, node.volume),
            FontId::proportional(12.0),
            text_color,
        );
    }
}
