use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Side length of one occupancy cell.
    pub grid_size: f32,
    /// Clearance kept around every obstacle.
    pub obstacle_padding: f32,
    /// Margin added around the routed region before rasterizing.
    pub bounds_padding: f32,
    pub corner_radius: f32,
    /// Straight run leaving each anchor before the first bend.
    pub stub_length: f32,
    /// Grids larger than this fall back to the closed-form route.
    pub max_grid_cells: usize,
    pub enable_grid_router: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            obstacle_padding: 12.0,
            bounds_padding: 50.0,
            corner_radius: 8.0,
            stub_length: 20.0,
            max_grid_cells: 250_000,
            enable_grid_router: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Height of the title band; member coordinates start below it.
    pub header_height: f32,
    /// Number of nesting levels allowed (a top-level group is level 0).
    pub max_depth: usize,
    pub default_width: f32,
    pub default_height: f32,
    pub min_width: f32,
    pub min_height: f32,
    pub content_padding: f32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            header_height: 32.0,
            max_depth: 3,
            default_width: 400.0,
            default_height: 300.0,
            min_width: 160.0,
            min_height: 96.0,
            content_padding: 16.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            width: 220.0,
            height: 72.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub gap: f32,
    pub max_rows: usize,
    /// Width used to derive the column count for top-level placement.
    pub container_width: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            gap: 24.0,
            max_rows: 50,
            container_width: 1200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragConfig {
    /// Pointer travel (screen pixels) before a press becomes a drag.
    pub threshold: f32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self { threshold: 4.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 4.0,
            zoom_step: 1.1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub routing: RoutingConfig,
    pub groups: GroupConfig,
    pub cards: CardConfig,
    pub placement: PlacementConfig,
    pub drag: DragConfig,
    pub viewport: ViewportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            padding: 40.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub canvas: CanvasConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::modern(),
            canvas: CanvasConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    line_color: Option<String>,
    card_fill: Option<String>,
    card_border: Option<String>,
    group_fill: Option<String>,
    group_border: Option<String>,
    todo_color: Option<String>,
    in_progress_color: Option<String>,
    done_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RoutingConfigFile {
    grid_size: Option<f32>,
    obstacle_padding: Option<f32>,
    bounds_padding: Option<f32>,
    corner_radius: Option<f32>,
    stub_length: Option<f32>,
    max_grid_cells: Option<usize>,
    enable_grid_router: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GroupConfigFile {
    header_height: Option<f32>,
    max_depth: Option<usize>,
    default_width: Option<f32>,
    default_height: Option<f32>,
    min_width: Option<f32>,
    min_height: Option<f32>,
    content_padding: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CanvasConfigFile {
    routing: Option<RoutingConfigFile>,
    groups: Option<GroupConfigFile>,
    card_width: Option<f32>,
    card_height: Option<f32>,
    placement_gap: Option<f32>,
    placement_max_rows: Option<usize>,
    container_width: Option<f32>,
    drag_threshold: Option<f32>,
    min_zoom: Option<f32>,
    max_zoom: Option<f32>,
    zoom_step: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    canvas: Option<CanvasConfigFile>,
    width: Option<f32>,
    height: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        } else if theme_name == "modern" {
            config.theme = Theme::modern();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.card_fill {
            config.theme.card_fill = v;
        }
        if let Some(v) = vars.card_border {
            config.theme.card_border = v;
        }
        if let Some(v) = vars.group_fill {
            config.theme.group_fill = v;
        }
        if let Some(v) = vars.group_border {
            config.theme.group_border = v;
        }
        if let Some(v) = vars.todo_color {
            config.theme.todo_color = v;
        }
        if let Some(v) = vars.in_progress_color {
            config.theme.in_progress_color = v;
        }
        if let Some(v) = vars.done_color {
            config.theme.done_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(canvas) = parsed.canvas {
        apply_canvas_overrides(&mut config.canvas, canvas);
    }

    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }

    Ok(config)
}

fn apply_canvas_overrides(config: &mut CanvasConfig, file: CanvasConfigFile) {
    if let Some(routing) = file.routing {
        if let Some(v) = routing.grid_size {
            config.routing.grid_size = v.max(1.0);
        }
        if let Some(v) = routing.obstacle_padding {
            config.routing.obstacle_padding = v.max(0.0);
        }
        if let Some(v) = routing.bounds_padding {
            config.routing.bounds_padding = v.max(0.0);
        }
        if let Some(v) = routing.corner_radius {
            config.routing.corner_radius = v.max(0.0);
        }
        if let Some(v) = routing.stub_length {
            config.routing.stub_length = v.max(0.0);
        }
        if let Some(v) = routing.max_grid_cells {
            config.routing.max_grid_cells = v;
        }
        if let Some(v) = routing.enable_grid_router {
            config.routing.enable_grid_router = v;
        }
    }
    if let Some(groups) = file.groups {
        if let Some(v) = groups.header_height {
            config.groups.header_height = v.max(0.0);
        }
        if let Some(v) = groups.max_depth {
            config.groups.max_depth = v.max(1);
        }
        if let Some(v) = groups.default_width {
            config.groups.default_width = v;
        }
        if let Some(v) = groups.default_height {
            config.groups.default_height = v;
        }
        if let Some(v) = groups.min_width {
            config.groups.min_width = v;
        }
        if let Some(v) = groups.min_height {
            config.groups.min_height = v;
        }
        if let Some(v) = groups.content_padding {
            config.groups.content_padding = v;
        }
    }
    if let Some(v) = file.card_width {
        config.cards.width = v;
    }
    if let Some(v) = file.card_height {
        config.cards.height = v;
    }
    if let Some(v) = file.placement_gap {
        config.placement.gap = v.max(0.0);
    }
    if let Some(v) = file.placement_max_rows {
        config.placement.max_rows = v;
    }
    if let Some(v) = file.container_width {
        config.placement.container_width = v;
    }
    if let Some(v) = file.drag_threshold {
        config.drag.threshold = v.max(0.0);
    }
    if let Some(v) = file.min_zoom {
        config.viewport.min_zoom = v;
    }
    if let Some(v) = file.max_zoom {
        config.viewport.max_zoom = v;
    }
    if let Some(v) = file.zoom_step {
        config.viewport.zoom_step = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_router_constants() {
        let config = CanvasConfig::default();
        assert_eq!(config.routing.grid_size, 10.0);
        assert_eq!(config.routing.obstacle_padding, 12.0);
        assert_eq!(config.routing.bounds_padding, 50.0);
        assert_eq!(config.routing.corner_radius, 8.0);
        assert_eq!(config.routing.stub_length, 20.0);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config = parse_config(
            r##"{
                "theme": "classic",
                "themeVariables": { "doneColor": "#00ff00" },
                "canvas": {
                    "routing": { "gridSize": 5, "cornerRadius": 0 },
                    "groups": { "maxDepth": 5 },
                    "dragThreshold": 8
                }
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.done_color, "#00ff00");
        assert_eq!(config.canvas.routing.grid_size, 5.0);
        assert_eq!(config.canvas.routing.corner_radius, 0.0);
        assert_eq!(config.canvas.routing.stub_length, 20.0);
        assert_eq!(config.canvas.groups.max_depth, 5);
        assert_eq!(config.canvas.drag.threshold, 8.0);
    }

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.canvas.groups.header_height, 32.0);
    }
}
