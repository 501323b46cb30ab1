//! Layout computation, results and tree dumps.

use std::fmt::Write as _;

use bitflags::bitflags;
use taffy::{AvailableSpace, Display, NodeId, Size, Style};

use crate::engine::{with_engine, Engine};
use crate::error::Result;
use crate::tree::Node;

use super::style::Dimension;

// =============================================================================
// RESULTS
// =============================================================================

/// Edge values of a computed layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Computed layout of one node, relative to its parent, on the config's pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeLayout {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub border: Edges,
    pub padding: Edges,
}

const EPSILON: f32 = 0.0001;

fn inexact_equals(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Snap `value` to the grid of a display with `point_scale_factor` pixels per point.
///
/// `force_ceil` and `force_floor` pick the rounding direction when the value is
/// not already on the grid. A scale factor of 0 leaves the value alone.
pub fn round_value_to_pixel_grid(
    value: f32,
    point_scale_factor: f32,
    force_ceil: bool,
    force_floor: bool,
) -> f32 {
    if point_scale_factor == 0.0 {
        return value;
    }
    let mut scaled = value * point_scale_factor;
    let mut fraction = scaled % 1.0;
    if fraction < 0.0 {
        fraction += 1.0;
    }

    if inexact_equals(fraction, 0.0) {
        scaled -= fraction;
    } else if inexact_equals(fraction, 1.0) {
        scaled = scaled - fraction + 1.0;
    } else if force_ceil {
        scaled = scaled - fraction + 1.0;
    } else if force_floor {
        scaled -= fraction;
    } else {
        scaled = scaled - fraction + if fraction >= 0.5 { 1.0 } else { 0.0 };
    }

    if scaled.is_nan() || point_scale_factor.is_nan() {
        return f32::NAN;
    }
    scaled / point_scale_factor
}

fn edges(rect: taffy::Rect<f32>, scale: f32) -> Edges {
    Edges {
        left: round_value_to_pixel_grid(rect.left, scale, false, false),
        top: round_value_to_pixel_grid(rect.top, scale, false, false),
        right: round_value_to_pixel_grid(rect.right, scale, false, false),
        bottom: round_value_to_pixel_grid(rect.bottom, scale, false, false),
    }
}

/// Absolute origin of `node`'s parent, summed up the native parent chain.
fn parent_origin(engine: &Engine, node: NodeId) -> Result<(f32, f32)> {
    let (mut x, mut y) = (0.0, 0.0);
    let mut current = engine.parent(node);
    while let Some(parent) = current {
        let location = engine.layout(parent)?.location;
        x += location.x;
        y += location.y;
        current = engine.parent(parent);
    }
    Ok((x, y))
}

// =============================================================================
// PRINT OPTIONS
// =============================================================================

bitflags! {
    /// What [`Node::print`] includes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PrintOptions: u32 {
        const LAYOUT   = 1;
        const STYLE    = 2;
        const CHILDREN = 4;
    }
}

fn write_dimension(out: &mut String, name: &str, dim: taffy::Dimension) {
    match Dimension::from_taffy(dim) {
        Dimension::Auto => {}
        Dimension::Points(n) => {
            let _ = write!(out, "{name}: {n}px; ");
        }
        Dimension::Percent(p) => {
            let _ = write!(out, "{name}: {p}%; ");
        }
    }
}

fn write_style(out: &mut String, style: &Style) {
    let _ = write!(out, "flex-direction: {:?}; ", style.flex_direction);
    if style.flex_grow != 0.0 {
        let _ = write!(out, "flex-grow: {}; ", style.flex_grow);
    }
    let _ = write!(out, "flex-shrink: {}; ", style.flex_shrink);
    write_dimension(out, "flex-basis", style.flex_basis);
    write_dimension(out, "width", style.size.width);
    write_dimension(out, "height", style.size.height);
    write_dimension(out, "min-width", style.min_size.width);
    write_dimension(out, "min-height", style.min_size.height);
    write_dimension(out, "max-width", style.max_size.width);
    write_dimension(out, "max-height", style.max_size.height);
    if style.display == Display::None {
        out.push_str("display: none; ");
    }
    if style.position == taffy::Position::Absolute {
        out.push_str("position: absolute; ");
    }
}

fn write_node(engine: &Engine, out: &mut String, node: NodeId, options: PrintOptions, level: usize) -> Result<()> {
    let indent = "  ".repeat(level);
    out.push_str(&indent);
    out.push_str("<div ");

    if options.contains(PrintOptions::LAYOUT) {
        let layout = engine.layout(node)?;
        let _ = write!(
            out,
            "layout=\"width: {}; height: {}; top: {}; left: {};\" ",
            layout.size.width, layout.size.height, layout.location.y, layout.location.x,
        );
    }
    if options.contains(PrintOptions::STYLE) {
        out.push_str("style=\"");
        write_style(out, engine.style(node)?);
        out.push_str("\" ");
    }
    if engine.has_measure_func(node) {
        out.push_str("has-custom-measure=\"true\" ");
    }
    out.push('>');

    let children = engine.children(node)?;
    if options.contains(PrintOptions::CHILDREN) && !children.is_empty() {
        for child in children {
            out.push('\n');
            write_node(engine, out, child, options, level + 1)?;
        }
        out.push('\n');
        out.push_str(&indent);
    }
    out.push_str("</div>");
    Ok(())
}

// =============================================================================
// NODE SURFACE
// =============================================================================

fn available(value: Option<f32>) -> AvailableSpace {
    match value {
        Some(points) => AvailableSpace::Definite(points),
        None => AvailableSpace::MaxContent,
    }
}

impl<N, C> Node<N, C> {
    /// Lay out the subtree rooted here. `None` leaves an axis unconstrained.
    ///
    /// Measure functions run during this call. Every node of the subtree is
    /// flagged with a new layout afterwards.
    pub fn calculate_layout(&self, width: Option<f32>, height: Option<f32>) -> Result<()> {
        let native = self.native_id();
        let space = Size {
            width: available(width),
            height: available(height),
        };
        with_engine(|engine| engine.calculate_layout(native, space))?;
        log::debug!("laid out {native:?} in {width:?} x {height:?}");

        if self.config().print_tree() {
            self.print(PrintOptions::all())?;
        }
        Ok(())
    }

    /// Last computed layout, rounded to the config's pixel grid.
    ///
    /// Position and size are snapped in absolute coordinates, so adjacent
    /// siblings never gain or lose a pixel between them.
    pub fn layout(&self) -> Result<NodeLayout> {
        let native = self.native_id();
        let scale = self.config().point_scale_factor();
        let is_text = self.node_type() == crate::engine::NodeType::Text;

        with_engine(|engine| -> Result<NodeLayout> {
            let (origin_x, origin_y) = parent_origin(engine, native)?;
            let raw = engine.layout(native)?;

            let abs_left = origin_x + raw.location.x;
            let abs_top = origin_y + raw.location.y;
            let abs_right = abs_left + raw.size.width;
            let abs_bottom = abs_top + raw.size.height;

            // Text rounds its size up so content is never clipped
            let width = round_value_to_pixel_grid(abs_right, scale, is_text, false)
                - round_value_to_pixel_grid(abs_left, scale, false, false);
            let height = round_value_to_pixel_grid(abs_bottom, scale, is_text, false)
                - round_value_to_pixel_grid(abs_top, scale, false, false);

            Ok(NodeLayout {
                left: round_value_to_pixel_grid(raw.location.x, scale, false, false),
                top: round_value_to_pixel_grid(raw.location.y, scale, false, false),
                width,
                height,
                border: edges(raw.border, scale),
                padding: edges(raw.padding, scale),
            })
        })
    }

    /// Render the subtree as nested `<div>` elements and log it at debug level.
    pub fn print(&self, options: PrintOptions) -> Result<String> {
        let native = self.native_id();
        let mut out = String::new();
        with_engine(|engine| write_node(engine, &mut out, native, options, 0))?;
        log::debug!("{out}");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NodeType;
    use taffy::FlexDirection;

    type TestNode = Node<&'static str, ()>;

    fn node(name: &'static str) -> TestNode {
        Node::new(name, ()).unwrap()
    }

    #[test]
    fn test_round_value_to_pixel_grid() {
        assert_eq!(round_value_to_pixel_grid(1.4, 1.0, false, false), 1.0);
        assert_eq!(round_value_to_pixel_grid(1.5, 1.0, false, false), 2.0);
        assert_eq!(round_value_to_pixel_grid(1.2, 1.0, true, false), 2.0);
        assert_eq!(round_value_to_pixel_grid(1.8, 1.0, false, true), 1.0);
        assert_eq!(round_value_to_pixel_grid(1.3, 2.0, false, false), 1.5);
        assert_eq!(round_value_to_pixel_grid(1.37, 0.0, false, false), 1.37);
    }

    #[test]
    fn test_column_layout() {
        let root = node("root");
        root.set_width(100.0).unwrap();
        root.set_height(100.0).unwrap();
        let (a, b) = (node("a"), node("b"));
        a.set_height(30.0).unwrap();
        b.set_flex_grow(1.0).unwrap();
        root.set_children(&[a.clone(), b.clone()]).unwrap();

        root.calculate_layout(None, None).unwrap();

        let layout = b.layout().unwrap();
        assert_eq!(layout.top, 30.0);
        assert_eq!(layout.height, 70.0);
        assert_eq!(layout.width, 100.0);
        assert!(a.has_new_layout());
    }

    #[test]
    fn test_measure_func_drives_leaf() {
        let root = node("root");
        root.set_flex_direction(FlexDirection::Row).unwrap();
        let text = node("text");
        text.set_node_type(NodeType::Text);
        text.set_measure_func(|_, _| Size { width: 10.4, height: 2.2 }).unwrap();
        root.insert_child(&text, 0).unwrap();

        root.calculate_layout(Some(50.0), None).unwrap();

        // Text sizes round up
        let layout = text.layout().unwrap();
        assert_eq!(layout.width, 11.0);
        assert_eq!(layout.height, 3.0);
    }

    #[test]
    fn test_layout_follows_scale_factor() {
        let root = node("root");
        root.config().set_point_scale_factor(0.0);
        root.set_width(10.3).unwrap();
        root.set_height(5.0).unwrap();

        root.calculate_layout(None, None).unwrap();
        assert_eq!(root.layout().unwrap().width, 10.3);

        root.config().set_point_scale_factor(1.0);
        assert_eq!(root.layout().unwrap().width, 10.0);
    }

    #[test]
    fn test_print_options() {
        let root = node("root");
        root.set_width(20.0).unwrap();
        root.insert_child(&node("child"), 0).unwrap();
        root.calculate_layout(None, None).unwrap();

        let flat = root.print(PrintOptions::LAYOUT).unwrap();
        assert!(flat.starts_with("<div layout=\"width: 20;"));
        assert_eq!(flat.matches("<div").count(), 1);

        let full = root.print(PrintOptions::all()).unwrap();
        assert_eq!(full.matches("<div").count(), 2);
        assert!(full.contains("width: 20px;"));
    }

    #[test]
    fn test_print_option_bits() {
        assert_eq!(PrintOptions::LAYOUT.bits(), 1);
        assert_eq!(PrintOptions::STYLE.bits(), 2);
        assert_eq!(PrintOptions::CHILDREN.bits(), 4);
    }
}
