//! Isotype chart layout: represents categorical counts as stacks of
//! repeated icons rather than continuous bars. [`compute_layout`] is a pure
//! function from columns and plot dimensions to placed-icon geometry; it
//! knows nothing about output formats. [`render_svg`] is one adapter over
//! that geometry, and [`HoverTracker`] turns pointer positions into
//! enter/leave events for hosts that have one. The tags overview page feeds
//! tag frequencies through this module; the layout itself has no knowledge
//! of tags.

use std::fmt::Write;

/// The default fraction of the available cell left to each icon. The
/// remainder becomes padding between icons.
pub const DEFAULT_SCALE_FACTOR: f64 = 0.85;

/// The fill color applied to icons whose column doesn't specify one.
pub const DEFAULT_FILL: &str = "rgb(18, 147, 154)";

/// One categorical datum: a label and a non-negative count. Labels are
/// expected to be unique within a chart.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub label: String,
    pub count: u32,

    /// Optional per-column fill color; [`DEFAULT_FILL`] otherwise.
    pub fill: Option<String>,
}

impl Column {
    pub fn new(label: impl Into<String>, count: u32) -> Column {
        Column {
            label: label.into(),
            count,
            fill: None,
        }
    }
}

/// One placed icon: a column's count expands into `count` of these, with
/// `unit` running 1..=count from the axis baseline upward. `x`/`y` is the
/// icon's top-left corner in plot coordinates (y grows downward).
#[derive(Clone, Debug, PartialEq)]
pub struct Icon {
    pub column: usize,
    pub unit: u32,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// An invisible rectangle spanning a column's full band at full plot
/// height, used only for pointer-hover detection. Placement is independent
/// of the icons.
#[derive(Clone, Debug, PartialEq)]
pub struct HitRegion {
    pub column: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The computed geometry for one chart: all icons (in column order, then
/// bottom-to-top within a column) plus one hit region per column.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub icon_size: f64,
    pub icons: Vec<Icon>,
    pub hit_regions: Vec<HitRegion>,
}

impl Layout {
    /// Returns the index of the column whose hit region contains the
    /// point, if any.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<usize> {
        self.hit_regions
            .iter()
            .find(|r| {
                x >= r.x && x < r.x + r.width && y >= r.y && y < r.y + r.height
            })
            .map(|r| r.column)
    }
}

/// An ordinal band scale: equal-width contiguous intervals along the
/// horizontal axis, one per category, in declaration order.
#[derive(Clone, Copy, Debug)]
pub struct BandScale {
    range: f64,
    bands: usize,
}

impl BandScale {
    pub fn new(range: f64, bands: usize) -> BandScale {
        BandScale { range, bands }
    }

    /// The width of each band.
    pub fn band_width(&self) -> f64 {
        self.range / self.bands as f64
    }

    /// The horizontal start of band `i`.
    pub fn start(&self, i: usize) -> f64 {
        i as f64 * self.band_width()
    }

    /// The horizontal center of band `i`.
    pub fn center(&self, i: usize) -> f64 {
        self.start(i) + self.band_width() / 2.0
    }
}

/// A linear, zero-based value scale for the vertical axis: value 0 maps to
/// the baseline at the bottom of the plot and `max` maps to the top.
#[derive(Clone, Copy, Debug)]
pub struct LinearScale {
    range: f64,
    unit: f64,
}

impl LinearScale {
    /// `range` is the plot height; `max` is the largest value in the
    /// domain. A domain of all zeros has no meaningful unit distance, so
    /// the unit falls back to the whole range (nothing is drawn at that
    /// distance anyway; the fallback only keeps derived icon sizes finite).
    pub fn new(range: f64, max: u32) -> LinearScale {
        LinearScale {
            range,
            unit: if max == 0 { range } else { range / max as f64 },
        }
    }

    /// The plotting-coordinate distance representing one count unit.
    pub fn unit(&self) -> f64 {
        self.unit
    }

    /// Maps a value to its vertical plot coordinate, measured down from
    /// the top of the plot.
    pub fn to_plot(&self, value: u32) -> f64 {
        self.range - value as f64 * self.unit
    }
}

/// Computes icon placements for `columns` over a `plot_width` ×
/// `plot_height` plot. `scale_factor` is a fraction in (0, 1] controlling
/// icon padding; icons are sized to the minimum of the per-category width
/// and the per-unit height so they never overlap horizontally or
/// vertically, whatever the category count or value magnitude.
///
/// Zero-count columns produce no icons but still get a hit region. The
/// function is total over well-typed input: every valid input produces a
/// valid, possibly empty, layout.
pub fn compute_layout(
    columns: &[Column],
    plot_width: f64,
    plot_height: f64,
    scale_factor: f64,
) -> Layout {
    if columns.is_empty() {
        return Layout {
            icon_size: 0.0,
            icons: Vec::new(),
            hit_regions: Vec::new(),
        };
    }

    let bands = BandScale::new(plot_width, columns.len());
    let values = LinearScale::new(
        plot_height,
        columns.iter().map(|c| c.count).max().unwrap_or(0),
    );
    let icon_size = bands.band_width().min(values.unit()) * scale_factor;

    let mut icons = Vec::with_capacity(columns.iter().map(|c| c.count as usize).sum());
    let mut hit_regions = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        hit_regions.push(HitRegion {
            column: i,
            x: bands.start(i),
            y: 0.0,
            width: bands.band_width(),
            height: plot_height,
        });

        for unit in 1..=column.count {
            icons.push(Icon {
                column: i,
                unit,
                x: bands.center(i) - icon_size / 2.0,
                y: values.to_plot(unit),
                size: icon_size,
            });
        }
    }

    Layout {
        icon_size,
        icons,
        hit_regions,
    }
}

/// Renders one icon into an SVG fragment. Implementations receive the
/// column the icon belongs to, so a single renderer can vary its symbol per
/// category (the composition-based replacement for per-datum renderer
/// callbacks).
pub trait IconRenderer {
    fn render(
        &self,
        w: &mut String,
        column: &Column,
        icon: &Icon,
        fill: &str,
    ) -> std::fmt::Result;
}

/// The fallback icon: a plain filled square.
pub struct RectIcon;

impl IconRenderer for RectIcon {
    fn render(
        &self,
        w: &mut String,
        _column: &Column,
        icon: &Icon,
        fill: &str,
    ) -> std::fmt::Result {
        write!(
            w,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            icon.x, icon.y, icon.size, icon.size, fill
        )
    }
}

/// Renders a [`Layout`] as an SVG `<g>` group: per column, a transparent
/// full-height hit rectangle (carrying a `data-category` attribute for
/// hosts that attach pointer events) followed by its icons bottom-to-top.
/// The caller composites the group with axes, grid lines, and the `<svg>`
/// envelope.
pub fn render_svg(
    columns: &[Column],
    layout: &Layout,
    icon_renderer: &dyn IconRenderer,
) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    render_svg_to(&mut out, columns, layout, icon_renderer).unwrap();
    out
}

fn render_svg_to(
    w: &mut String,
    columns: &[Column],
    layout: &Layout,
    icon_renderer: &dyn IconRenderer,
) -> std::fmt::Result {
    w.push_str(r#"<g class="isotype">"#);
    for region in layout.hit_regions.iter() {
        let column = &columns[region.column];
        write!(
            w,
            r#"<g data-category="{}">"#,
            escape_attribute(&column.label)
        )?;
        write!(
            w,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="transparent"/>"#,
            region.x, region.y, region.width, region.height
        )?;

        let fill = column.fill.as_deref().unwrap_or(DEFAULT_FILL);
        for icon in layout.icons.iter().filter(|i| i.column == region.column) {
            icon_renderer.render(w, column, icon, fill)?;
        }
        w.push_str("</g>");
    }
    w.push_str("</g>");
    Ok(())
}

fn escape_attribute(s: &str) -> String {
    let mut escaped = String::new();
    // Escaping into a String cannot fail.
    pulldown_cmark::escape::escape_html(&mut escaped, s).unwrap();
    escaped
}

/// A hover enter/leave notification carrying the hovered column.
#[derive(Clone, Debug, PartialEq)]
pub enum HoverEvent<'a> {
    Enter(&'a Column),
    Leave(&'a Column),
}

/// Tracks which column the pointer is over and emits [`HoverEvent`]s on
/// transitions. Feeding the same column repeatedly emits nothing; moving
/// between columns emits the leave before the enter.
#[derive(Debug, Default)]
pub struct HoverTracker {
    active: Option<usize>,
}

impl HoverTracker {
    pub fn new() -> HoverTracker {
        HoverTracker { active: None }
    }

    /// Updates the tracker with the pointer's plot position, or `None` when
    /// the pointer has left the plot entirely.
    pub fn update<'a>(
        &mut self,
        columns: &'a [Column],
        layout: &Layout,
        position: Option<(f64, f64)>,
    ) -> Vec<HoverEvent<'a>> {
        let hit = position.and_then(|(x, y)| layout.hit_test(x, y));
        if hit == self.active {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(i) = self.active {
            events.push(HoverEvent::Leave(&columns[i]));
        }
        if let Some(i) = hit {
            events.push(HoverEvent::Enter(&columns[i]));
        }
        self.active = hit;
        events
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_zero_count_column() {
        let columns = vec![Column::new("empty", 0)];
        let layout = compute_layout(&columns, 200.0, 100.0, DEFAULT_SCALE_FACTOR);

        assert!(layout.icons.is_empty());
        assert_eq!(layout.hit_regions.len(), 1);

        let region = &layout.hit_regions[0];
        assert!(approx(region.x, 0.0));
        assert!(approx(region.y, 0.0));
        assert!(approx(region.width, 200.0));
        assert!(approx(region.height, 100.0));

        // The all-zero fallback keeps the icon size finite.
        assert!(layout.icon_size.is_finite());
    }

    #[test]
    fn test_two_column_example() {
        // Columns A:2 and B:1 over a 200x100 plot: bands are 100 wide, one
        // count unit is 50 high, so icons are min(100, 50) * 0.85 = 42.5.
        let columns = vec![Column::new("A", 2), Column::new("B", 1)];
        let layout = compute_layout(&columns, 200.0, 100.0, DEFAULT_SCALE_FACTOR);

        assert!(approx(layout.icon_size, 42.5));

        let a: Vec<&Icon> = layout.icons.iter().filter(|i| i.column == 0).collect();
        let b: Vec<&Icon> = layout.icons.iter().filter(|i| i.column == 1).collect();
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);

        // A's icons stack upward from the baseline at the band center.
        assert!(approx(a[0].y, 50.0));
        assert!(approx(a[1].y, 0.0));
        assert!(approx(a[0].x, 50.0 - layout.icon_size / 2.0));

        // No horizontal overlap between adjacent columns.
        assert!(a[0].x + layout.icon_size <= b[0].x);
    }

    #[test]
    fn test_icon_size_capped_by_band_width() {
        // Many columns, small counts: the band width is the constraint.
        let columns: Vec<Column> =
            (0..10).map(|i| Column::new(format!("c{}", i), 1)).collect();
        let layout = compute_layout(&columns, 100.0, 400.0, 1.0);
        assert!(approx(layout.icon_size, 10.0));
    }

    #[test]
    fn test_icon_size_capped_by_unit_height() {
        // One column with a large count: the unit height is the constraint.
        let columns = vec![Column::new("tall", 20)];
        let layout = compute_layout(&columns, 400.0, 100.0, 1.0);
        assert!(approx(layout.icon_size, 5.0));
    }

    #[test]
    fn test_rendering_order() {
        let columns = vec![Column::new("A", 2), Column::new("B", 3)];
        let layout = compute_layout(&columns, 200.0, 120.0, DEFAULT_SCALE_FACTOR);

        // Column order, then bottom-to-top (unit ascending) within a column.
        let order: Vec<(usize, u32)> =
            layout.icons.iter().map(|i| (i.column, i.unit)).collect();
        assert_eq!(order, vec![(0, 1), (0, 2), (1, 1), (1, 2), (1, 3)]);
    }

    #[test]
    fn test_no_vertical_overlap_within_column() {
        let columns = vec![Column::new("tall", 7)];
        let layout = compute_layout(&columns, 50.0, 140.0, DEFAULT_SCALE_FACTOR);

        let mut icons = layout.icons.clone();
        icons.sort_by(|a, b| a.unit.cmp(&b.unit));
        for pair in icons.windows(2) {
            // The higher icon (larger unit, smaller y) ends above where the
            // lower one starts.
            assert!(pair[1].y + pair[1].size <= pair[0].y + 1e-9);
        }
    }

    #[test]
    fn test_empty_chart() {
        let layout = compute_layout(&[], 200.0, 100.0, DEFAULT_SCALE_FACTOR);
        assert!(layout.icons.is_empty());
        assert!(layout.hit_regions.is_empty());
    }

    #[test]
    fn test_hit_test() {
        let columns = vec![Column::new("A", 1), Column::new("B", 1)];
        let layout = compute_layout(&columns, 200.0, 100.0, DEFAULT_SCALE_FACTOR);

        assert_eq!(layout.hit_test(10.0, 50.0), Some(0));
        assert_eq!(layout.hit_test(150.0, 99.0), Some(1));
        assert_eq!(layout.hit_test(250.0, 50.0), None);
        assert_eq!(layout.hit_test(10.0, 150.0), None);
    }

    #[test]
    fn test_hover_enter_and_leave() {
        let columns = vec![Column::new("A", 1), Column::new("B", 1)];
        let layout = compute_layout(&columns, 200.0, 100.0, DEFAULT_SCALE_FACTOR);
        let mut tracker = HoverTracker::new();

        // Entering the first band.
        let events = tracker.update(&columns, &layout, Some((10.0, 50.0)));
        assert_eq!(events, vec![HoverEvent::Enter(&columns[0])]);

        // Staying put emits nothing.
        let events = tracker.update(&columns, &layout, Some((20.0, 60.0)));
        assert!(events.is_empty());

        // Crossing into the second band leaves before entering.
        let events = tracker.update(&columns, &layout, Some((150.0, 50.0)));
        assert_eq!(
            events,
            vec![HoverEvent::Leave(&columns[0]), HoverEvent::Enter(&columns[1])]
        );

        // Leaving the plot.
        let events = tracker.update(&columns, &layout, None);
        assert_eq!(events, vec![HoverEvent::Leave(&columns[1])]);
    }

    #[test]
    fn test_render_svg_rect_counts() {
        let columns = vec![Column::new("A", 2), Column::new("B", 1)];
        let layout = compute_layout(&columns, 200.0, 100.0, DEFAULT_SCALE_FACTOR);
        let svg = render_svg(&columns, &layout, &RectIcon);

        // One transparent hit rect per column plus one rect per count unit.
        assert_eq!(svg.matches("<rect").count(), 2 + 3);
        assert_eq!(svg.matches("fill=\"transparent\"").count(), 2);
        assert!(svg.contains(r#"data-category="A""#));
        assert!(svg.contains(DEFAULT_FILL));
    }

    #[test]
    fn test_render_svg_escapes_labels() {
        let columns = vec![Column::new("a<b>&\"c\"", 0)];
        let layout = compute_layout(&columns, 100.0, 100.0, DEFAULT_SCALE_FACTOR);
        let svg = render_svg(&columns, &layout, &RectIcon);
        assert!(svg.contains("a&lt;b&gt;&amp;&quot;c&quot;"));
    }

    #[test]
    fn test_custom_fill() {
        let mut column = Column::new("A", 1);
        column.fill = Some("#fcba03".to_owned());
        let columns = vec![column];
        let layout = compute_layout(&columns, 100.0, 100.0, DEFAULT_SCALE_FACTOR);
        let svg = render_svg(&columns, &layout, &RectIcon);
        assert!(svg.contains("#fcba03"));
        assert!(!svg.contains(DEFAULT_FILL));
    }
}
