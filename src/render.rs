use crate::canvas::{CardView, GroupView, Scene};
use crate::config::{GroupConfig, RenderConfig};
use crate::geometry::Rect;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const STATUS_STRIPE: f32 = 4.0;

/// Static SVG preview of a computed scene. Groups are drawn outermost first,
/// then relations, then cards on top.
pub fn render_svg(scene: &Scene, theme: &Theme, groups: &GroupConfig, config: &RenderConfig) -> String {
    let bounds = scene
        .bounds
        .map(|b| b.expand(config.padding))
        .unwrap_or_else(|| Rect::new(0.0, 0.0, config.width, config.height));
    let width = bounds.width.max(200.0);
    let height = bounds.height.max(200.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{:.2} {:.2} {width:.2} {height:.2}\">",
        bounds.x, bounds.y
    ));
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        bounds.x, bounds.y, theme.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    let mut ordered: Vec<&GroupView> = scene.groups.iter().collect();
    ordered.sort_by_key(|group| group.depth);
    for group in ordered {
        svg.push_str(&group_svg(group, theme, groups.header_height));
    }

    for relation in &scene.relations {
        let dash = if relation.manual { " stroke-dasharray=\"5 3\"" } else { "" };
        svg.push_str(&format!(
            "<path data-relation=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\"{dash} marker-end=\"url(#arrow)\"/>",
            escape_xml(&relation.id),
            relation.path,
            theme.line_color
        ));
    }

    for card in &scene.cards {
        svg.push_str(&card_svg(card, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn group_svg(group: &GroupView, theme: &Theme, header_height: f32) -> String {
    let r = group.rect;
    let mut out = String::new();
    out.push_str(&format!(
        "<rect data-group=\"{}\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.2\"/>",
        escape_xml(&group.id),
        r.x,
        r.y,
        r.width,
        r.height,
        theme.group_fill,
        theme.group_border
    ));
    let header = header_height.min(r.height);
    out.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{header:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\"/>",
        r.x, r.y, r.width, theme.group_header
    ));
    let label_y = r.y + header / 2.0 + theme.font_size * 0.35;
    out.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{label_y:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        r.x + 12.0,
        theme.font_family,
        theme.font_size,
        theme.card_text,
        escape_xml(&group.name)
    ));
    out
}

fn card_svg(card: &CardView, theme: &Theme) -> String {
    let r = card.rect;
    let mut out = String::new();
    let dash = if card.is_virtual { " stroke-dasharray=\"4 3\"" } else { "" };
    out.push_str(&format!(
        "<rect data-card=\"{}\" x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.2\"{dash}/>",
        escape_xml(&card.id),
        r.x,
        r.y,
        r.width,
        r.height,
        theme.card_fill,
        theme.card_border
    ));
    out.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{STATUS_STRIPE}\" height=\"{:.2}\" fill=\"{}\"/>",
        r.x,
        r.y,
        r.height,
        theme.status_color(card.status)
    ));
    let (cx, cy) = r.center();
    let text_y = cy + theme.font_size * 0.35;
    out.push_str(&format!(
        "<text x=\"{cx:.2}\" y=\"{text_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        theme.font_family,
        theme.font_size,
        theme.card_text,
        escape_xml(&card.label)
    ));
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
