//! Vector weather icons
//!
//! Each icon fits in an [`ICON_WIDTH`] x [`ICON_HEIGHT`] box anchored at its
//! top-left corner and is built from lines, circles and triangles only.

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle, Triangle},
};

use log::debug;

use super::INK;
use crate::icons::IconFamily;

pub const ICON_WIDTH: u32 = 72;
pub const ICON_HEIGHT: u32 = 60;

/// Sun ray directions every 30°, scaled by 1000
const RAY_DIRECTIONS: [(i32, i32); 12] = [
    (1000, 0),
    (866, 500),
    (500, 866),
    (0, 1000),
    (-500, 866),
    (-866, 500),
    (-1000, 0),
    (-866, -500),
    (-500, -866),
    (0, -1000),
    (500, -866),
    (866, -500),
];

fn stroke() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_stroke(INK, 1)
}

fn fill() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_fill(INK)
}

/// Draw the icon for `family` with its box at `origin`.
pub fn draw_icon<D: DrawTarget<Color = BinaryColor>>(
    display: &mut D,
    family: IconFamily,
    origin: Point,
) -> Result<(), D::Error> {
    debug!("Drawing {} icon at {:?}", family.label(), origin);
    match family {
        IconFamily::Clear => sun(display, origin + Point::new(36, 30), 12, 16, 24),
        IconFamily::FewClouds => {
            sun(display, origin + Point::new(24, 18), 8, 11, 16)?;
            cloud(display, origin + Point::new(6, 18))
        }
        IconFamily::Clouds => cloud(display, origin + Point::new(0, 8)),
        IconFamily::BrokenClouds => {
            cloud_outline(display, origin + Point::new(7, 0))?;
            cloud(display, origin + Point::new(0, 16))
        }
        IconFamily::ShowerRain => {
            cloud(display, origin)?;
            drops(display, origin, 5, 10, 8)
        }
        IconFamily::Rain => {
            cloud(display, origin)?;
            drops(display, origin, 3, 14, 12)
        }
        IconFamily::Thunderstorm => storm(display, origin),
        IconFamily::Snow => snow(display, origin),
        IconFamily::Mist => mist(display, origin),
    }
}

fn sun<D: DrawTarget<Color = BinaryColor>>(
    display: &mut D,
    center: Point,
    radius: u32,
    ray_inner: i32,
    ray_outer: i32,
) -> Result<(), D::Error> {
    Circle::with_center(center, radius * 2)
        .into_styled(stroke())
        .draw(display)?;

    for (dx, dy) in RAY_DIRECTIONS {
        let from = center + Point::new(dx * ray_inner / 1000, dy * ray_inner / 1000);
        let to = center + Point::new(dx * ray_outer / 1000, dy * ray_outer / 1000);
        Line::new(from, to).into_styled(stroke()).draw(display)?;
    }
    Ok(())
}

/// Filled cloud, about 60 x 38 px
fn cloud<D: DrawTarget<Color = BinaryColor>>(display: &mut D, at: Point) -> Result<(), D::Error> {
    Circle::with_center(at + Point::new(16, 20), 24)
        .into_styled(fill())
        .draw(display)?;
    Circle::with_center(at + Point::new(34, 16), 32)
        .into_styled(fill())
        .draw(display)?;
    Circle::with_center(at + Point::new(52, 20), 24)
        .into_styled(fill())
        .draw(display)?;
    Rectangle::new(at + Point::new(16, 20), Size::new(36, 18))
        .into_styled(fill())
        .draw(display)
}

fn cloud_outline<D: DrawTarget<Color = BinaryColor>>(
    display: &mut D,
    at: Point,
) -> Result<(), D::Error> {
    Circle::with_center(at + Point::new(16, 20), 24)
        .into_styled(stroke())
        .draw(display)?;
    Circle::with_center(at + Point::new(34, 16), 32)
        .into_styled(stroke())
        .draw(display)?;
    Circle::with_center(at + Point::new(52, 20), 24)
        .into_styled(stroke())
        .draw(display)?;
    Line::new(at + Point::new(16, 32), at + Point::new(52, 32))
        .into_styled(stroke())
        .draw(display)
}

fn drops<D: DrawTarget<Color = BinaryColor>>(
    display: &mut D,
    at: Point,
    count: i32,
    spacing: i32,
    length: i32,
) -> Result<(), D::Error> {
    let span = (count - 1) * spacing;
    let first = 34 - span / 2;
    for i in 0..count {
        let x = at.x + first + i * spacing;
        let top = at.y + 42;
        Line::new(Point::new(x, top), Point::new(x - 4, top + length))
            .into_styled(stroke())
            .draw(display)?;
    }
    Ok(())
}

fn storm<D: DrawTarget<Color = BinaryColor>>(display: &mut D, at: Point) -> Result<(), D::Error> {
    cloud(display, at)?;
    // Bolt, drawn as two triangles overlapping the cloud base
    Triangle::new(
        at + Point::new(34, 36),
        at + Point::new(24, 50),
        at + Point::new(38, 50),
    )
    .into_styled(fill())
    .draw(display)?;
    Triangle::new(
        at + Point::new(38, 48),
        at + Point::new(30, 59),
        at + Point::new(46, 46),
    )
    .into_styled(fill())
    .draw(display)
}

fn snow<D: DrawTarget<Color = BinaryColor>>(display: &mut D, at: Point) -> Result<(), D::Error> {
    cloud(display, at)?;
    for i in 0..3 {
        let c = at + Point::new(20 + i * 14, 50);
        for (from, to) in [
            (Point::new(-4, 0), Point::new(4, 0)),
            (Point::new(0, -4), Point::new(0, 4)),
            (Point::new(-3, -3), Point::new(3, 3)),
            (Point::new(-3, 3), Point::new(3, -3)),
        ] {
            Line::new(c + from, c + to).into_styled(stroke()).draw(display)?;
        }
    }
    Ok(())
}

fn mist<D: DrawTarget<Color = BinaryColor>>(display: &mut D, at: Point) -> Result<(), D::Error> {
    for (indent, y) in [(0, 18), (8, 30), (0, 42)] {
        Line::new(
            at + Point::new(indent, y),
            at + Point::new(ICON_WIDTH as i32 - 2 - indent, y),
        )
        .into_styled(stroke())
        .draw(display)?;
    }
    Ok(())
}
