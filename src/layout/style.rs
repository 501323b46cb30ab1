//! Style forwarders - Typed setters over the node's Taffy style.
//!
//! None of these touch ownership. Each one rewrites the style through the engine,
//! which marks the node dirty.

use taffy::{
    Dimension as TaffyDimension, Display, FlexDirection, LengthPercentage, LengthPercentageAuto,
    Position, Style,
};

use crate::error::Result;
use crate::tree::Node;

// =============================================================================
// DIMENSION
// =============================================================================

/// A length in points, a percentage (0-100) of the parent, or auto.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Points(f32),
    Percent(f32),
}

impl From<f32> for Dimension {
    fn from(value: f32) -> Self {
        Self::Points(value)
    }
}

impl Dimension {
    pub(crate) fn to_taffy(self) -> TaffyDimension {
        match self {
            Dimension::Auto => TaffyDimension::Auto,
            Dimension::Points(n) => TaffyDimension::Length(n),
            Dimension::Percent(p) => TaffyDimension::Percent(p / 100.0),
        }
    }

    pub(crate) fn from_taffy(dim: TaffyDimension) -> Self {
        match dim {
            TaffyDimension::Auto => Dimension::Auto,
            TaffyDimension::Length(n) => Dimension::Points(n),
            TaffyDimension::Percent(p) => Dimension::Percent(p * 100.0),
        }
    }

    fn to_taffy_lpa(self) -> LengthPercentageAuto {
        match self {
            Dimension::Auto => LengthPercentageAuto::Auto,
            Dimension::Points(n) => LengthPercentageAuto::Length(n),
            Dimension::Percent(p) => LengthPercentageAuto::Percent(p / 100.0),
        }
    }

    /// Padding has no auto; it collapses to zero.
    fn to_taffy_lp(self) -> LengthPercentage {
        match self {
            Dimension::Auto => LengthPercentage::Length(0.0),
            Dimension::Points(n) => LengthPercentage::Length(n),
            Dimension::Percent(p) => LengthPercentage::Percent(p / 100.0),
        }
    }
}

/// Box side addressed by margin and padding setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Top,
    Right,
    Bottom,
    Horizontal,
    Vertical,
    All,
}

impl Side {
    /// Apply `value` to every side this selector covers.
    fn apply<T: Copy>(self, rect: &mut taffy::Rect<T>, value: T) {
        let (left, top, right, bottom) = match self {
            Side::Left => (true, false, false, false),
            Side::Top => (false, true, false, false),
            Side::Right => (false, false, true, false),
            Side::Bottom => (false, false, false, true),
            Side::Horizontal => (true, false, true, false),
            Side::Vertical => (false, true, false, true),
            Side::All => (true, true, true, true),
        };
        if left {
            rect.left = value;
        }
        if top {
            rect.top = value;
        }
        if right {
            rect.right = value;
        }
        if bottom {
            rect.bottom = value;
        }
    }
}

// =============================================================================
// NODE FORWARDERS
// =============================================================================

impl<N, C> Node<N, C> {
    /// Snapshot of the node's style.
    pub fn style(&self) -> Result<Style> {
        let native = self.native_id();
        Ok(crate::engine::with_engine(|engine| engine.style(native).cloned())?)
    }

    /// Edit the style in place and write it back.
    pub fn update_style(&self, f: impl FnOnce(&mut Style)) -> Result<()> {
        let mut style = self.style()?;
        f(&mut style);
        let native = self.native_id();
        crate::engine::with_engine(|engine| engine.set_style(native, style))?;
        Ok(())
    }

    pub fn width(&self) -> Result<Dimension> {
        Ok(Dimension::from_taffy(self.style()?.size.width))
    }

    pub fn height(&self) -> Result<Dimension> {
        Ok(Dimension::from_taffy(self.style()?.size.height))
    }

    pub fn set_width(&self, width: impl Into<Dimension>) -> Result<()> {
        let width = width.into().to_taffy();
        self.update_style(|style| style.size.width = width)
    }

    pub fn set_height(&self, height: impl Into<Dimension>) -> Result<()> {
        let height = height.into().to_taffy();
        self.update_style(|style| style.size.height = height)
    }

    pub fn set_min_width(&self, width: impl Into<Dimension>) -> Result<()> {
        let width = width.into().to_taffy();
        self.update_style(|style| style.min_size.width = width)
    }

    pub fn set_min_height(&self, height: impl Into<Dimension>) -> Result<()> {
        let height = height.into().to_taffy();
        self.update_style(|style| style.min_size.height = height)
    }

    pub fn set_max_width(&self, width: impl Into<Dimension>) -> Result<()> {
        let width = width.into().to_taffy();
        self.update_style(|style| style.max_size.width = width)
    }

    pub fn set_max_height(&self, height: impl Into<Dimension>) -> Result<()> {
        let height = height.into().to_taffy();
        self.update_style(|style| style.max_size.height = height)
    }

    pub fn set_flex_direction(&self, direction: FlexDirection) -> Result<()> {
        self.update_style(|style| style.flex_direction = direction)
    }

    pub fn set_flex_grow(&self, grow: f32) -> Result<()> {
        self.update_style(|style| style.flex_grow = grow)
    }

    pub fn set_flex_shrink(&self, shrink: f32) -> Result<()> {
        self.update_style(|style| style.flex_shrink = shrink)
    }

    pub fn set_flex_basis(&self, basis: impl Into<Dimension>) -> Result<()> {
        let basis = basis.into().to_taffy();
        self.update_style(|style| style.flex_basis = basis)
    }

    pub fn set_margin(&self, side: Side, margin: impl Into<Dimension>) -> Result<()> {
        let margin = margin.into().to_taffy_lpa();
        self.update_style(|style| side.apply(&mut style.margin, margin))
    }

    pub fn set_padding(&self, side: Side, padding: impl Into<Dimension>) -> Result<()> {
        let padding = padding.into().to_taffy_lp();
        self.update_style(|style| side.apply(&mut style.padding, padding))
    }

    pub fn set_border(&self, side: Side, width: f32) -> Result<()> {
        self.update_style(|style| side.apply(&mut style.border, LengthPercentage::Length(width)))
    }

    pub fn set_display(&self, display: Display) -> Result<()> {
        self.update_style(|style| style.display = display)
    }

    pub fn set_position_type(&self, position: Position) -> Result<()> {
        self.update_style(|style| style.position = position)
    }
}
