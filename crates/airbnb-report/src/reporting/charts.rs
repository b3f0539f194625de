//! SVG chart rendering with plotters.
//!
//! Every chart is drawn into an in-memory SVG buffer first. The output file
//! is only created once drawing has succeeded.

use crate::aggregator::statistics::{linear_fit, quantile};
use crate::config::ChartStyle;
use crate::error::{ReportError, Result, ResultExt};
use crate::types::{ChartArtifact, ChartKind, EnrichedRecord, GroupStats, LinearFit};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Placeholder category so an empty categorical axis still renders.
const NO_DATA_LABEL: &str = "no data";

/// Points for the review rate against log price scatter.
///
/// Only rated listings take part, and the price cap is the `cap_quantile`
/// quantile of their prices. Keeps positive prices at or below the cap and
/// maps price to `ln(price)`.
pub fn review_rate_points(records: &[EnrichedRecord], cap_quantile: f64) -> Vec<(f64, f64)> {
    let rated: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|r| Some((r.listing.review_rating?, r.listing.price)))
        .collect();
    let prices: Vec<f64> = rated.iter().map(|(_, price)| *price).collect();
    let Some(cap) = quantile(&prices, cap_quantile) else {
        return Vec::new();
    };

    rated
        .into_iter()
        .filter(|(_, price)| *price > 0.0 && *price <= cap)
        .map(|(rating, price)| (rating, price.ln()))
        .collect()
}

/// OLS fit for the scatter, `None` with fewer than two distinct ratings.
pub fn review_rate_fit(points: &[(f64, f64)]) -> Option<LinearFit> {
    linear_fit(points)
}

/// Renders the report charts into an output directory.
pub struct ChartRenderer {
    output_dir: PathBuf,
    style: ChartStyle,
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, style: ChartStyle) -> Self {
        Self {
            output_dir: output_dir.into(),
            style,
        }
    }

    fn rgb(color: [u8; 3]) -> RGBColor {
        RGBColor(color[0], color[1], color[2])
    }

    fn caption_font(&self) -> (&str, f64) {
        (self.style.font_family.as_str(), f64::from(self.style.caption_size))
    }

    fn label_font(&self) -> (&str, f64) {
        (self.style.font_family.as_str(), f64::from(self.style.label_size))
    }

    /// Draw into a string buffer, then write the file.
    fn write_chart<F>(&self, kind: ChartKind, data_points: usize, draw: F) -> Result<ChartArtifact>
    where
        F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> anyhow::Result<()>,
    {
        let mut buffer = String::new();
        {
            let root = SVGBackend::with_string(&mut buffer, (self.style.width, self.style.height))
                .into_drawing_area();
            let rendered = root
                .fill(&WHITE)
                .map_err(anyhow::Error::from)
                .and_then(|_| draw(&root))
                .and_then(|_| root.present().map_err(anyhow::Error::from));

            rendered.map_err(|e| ReportError::Render {
                chart: kind.file_name().to_string(),
                reason: e.to_string(),
            })?;
        }

        fs::create_dir_all(&self.output_dir)
            .context(format!("Creating '{}'", self.output_dir.display()))?;
        let path = self.output_dir.join(kind.file_name());
        fs::write(&path, buffer.as_bytes()).context(format!("Writing '{}'", path.display()))?;

        info!("Chart saved: {} ({} data points)", path.display(), data_points);
        Ok(ChartArtifact {
            kind,
            path,
            data_points,
        })
    }

    /// Line chart of listings per construction year.
    pub fn construction_year_trend(&self, counts: &[(i32, usize)]) -> Result<ChartArtifact> {
        let (first, last) = match (counts.first(), counts.last()) {
            (Some(first), Some(last)) => (first.0, last.0),
            _ => (2000, 2001),
        };
        let max_count = counts.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1) as f64;
        let color = Self::rgb(self.style.primary_color);

        self.write_chart(ChartKind::ConstructionYearTrend, counts.len(), |root| {
            let mut chart = ChartBuilder::on(root)
                .caption("Listings by Construction Year", self.caption_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(first..last.max(first + 1), 0f64..max_count * 1.1)?;

            chart
                .configure_mesh()
                .x_desc("Construction year")
                .y_desc("Number of listings")
                .label_style(self.label_font())
                .draw()?;

            let points: Vec<(i32, f64)> = counts.iter().map(|&(y, c)| (y, c as f64)).collect();
            chart.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?;
            chart.draw_series(
                points
                    .into_iter()
                    .map(|point| Circle::new(point, 4, color.filled())),
            )?;
            Ok(())
        })
    }

    /// Horizontal bars of mean price per neighborhood, first group on top.
    pub fn neighborhood_bars(
        &self,
        kind: ChartKind,
        title: &str,
        groups: &[GroupStats],
    ) -> Result<ChartArtifact> {
        let rows = groups.len().max(1) as i32;
        // row 0 is drawn at the bottom
        let labels: Vec<String> = groups.iter().rev().map(|g| g.key.clone()).collect();
        let max_price = groups
            .iter()
            .map(|g| g.mean_price)
            .fold(0.0_f64, f64::max)
            .max(1.0);
        let color = Self::rgb(self.style.primary_color);

        self.write_chart(kind, groups.len(), |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(title, self.caption_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(200)
                .build_cartesian_2d(0f64..max_price * 1.1, (0..rows).into_segmented())?;

            chart
                .configure_mesh()
                .disable_y_mesh()
                .y_labels(labels.len().max(1))
                .y_label_formatter(&|value| match value {
                    SegmentValue::CenterOf(row) => usize::try_from(*row)
                        .ok()
                        .and_then(|i| labels.get(i))
                        .cloned()
                        .unwrap_or_default(),
                    _ => String::new(),
                })
                .x_desc("Average price ($)")
                .label_style(self.label_font())
                .draw()?;

            let bars = groups.iter().rev().enumerate().map(|(row, group)| {
                let row = row as i32;
                Rectangle::new(
                    [
                        (0.0, SegmentValue::Exact(row)),
                        (group.mean_price, SegmentValue::Exact(row + 1)),
                    ],
                    color.filled(),
                )
            });
            chart.draw_series(bars)?;
            Ok(())
        })
    }

    /// Vertical boxplots of a metric per category. Empty groups are skipped.
    pub fn category_boxplot(
        &self,
        kind: ChartKind,
        title: &str,
        y_desc: &str,
        distributions: &[(String, Vec<f64>)],
    ) -> Result<ChartArtifact> {
        let groups: Vec<(&String, Quartiles)> = distributions
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(label, values)| (label, Quartiles::new(values)))
            .collect();

        let mut labels: Vec<String> = groups.iter().map(|(label, _)| (*label).clone()).collect();
        if labels.is_empty() {
            labels.push(NO_DATA_LABEL.to_string());
        }

        let (low, high) = groups
            .iter()
            .flat_map(|(_, q)| q.values())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let (low, high) = if low.is_finite() && high.is_finite() {
            let pad = ((high - low) * 0.1).max(1.0);
            ((low - pad).min(0.0), high + pad)
        } else {
            (0.0, 1.0)
        };
        let color = Self::rgb(self.style.primary_color);
        debug!("Boxplot '{}' over {} groups", title, groups.len());

        self.write_chart(kind, groups.len(), |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(title, self.caption_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(labels[..].into_segmented(), low..high)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_label_formatter(&|value| match value {
                    SegmentValue::CenterOf(label) | SegmentValue::Exact(label) => {
                        label.to_string()
                    }
                    SegmentValue::Last => String::new(),
                })
                .y_desc(y_desc)
                .label_style(self.label_font())
                .draw()?;

            chart.draw_series(groups.iter().enumerate().map(|(i, (_, quartiles))| {
                Boxplot::new_vertical(SegmentValue::CenterOf(&labels[i]), quartiles)
                    .width(40)
                    .whisker_width(0.5)
                    .style(color.stroke_width(2))
            }))?;
            Ok(())
        })
    }

    /// Scatter of review rate against log price with an optional OLS line.
    pub fn review_rate_scatter(
        &self,
        points: &[(f64, f64)],
        fit: Option<&LinearFit>,
    ) -> Result<ChartArtifact> {
        let (x_min, x_max) = padded(extent(points.iter().map(|p| p.0)), (0.0, 5.0));
        let (y_min, y_max) = padded(extent(points.iter().map(|p| p.1)), (0.0, 8.0));
        let dots = Self::rgb(self.style.primary_color);
        let accent = Self::rgb(self.style.accent_color);

        self.write_chart(ChartKind::ReviewRateVsLogPrice, points.len(), |root| {
            let mut chart = ChartBuilder::on(root)
                .caption("Review Rate vs Log Price", self.caption_font())
                .margin(15)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

            chart
                .configure_mesh()
                .x_desc("Review rate number")
                .y_desc("ln(price)")
                .label_style(self.label_font())
                .draw()?;

            chart.draw_series(
                points
                    .iter()
                    .map(|&point| Circle::new(point, 3, dots.mix(0.2).filled())),
            )?;

            if let Some(fit) = fit {
                let line = vec![(x_min, fit.predict(x_min)), (x_max, fit.predict(x_max))];
                chart.draw_series(LineSeries::new(line, accent.stroke_width(2)))?;
            }
            Ok(())
        })
    }
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Pad a `(min, max)` range by 5%, or use `fallback` when it is empty.
fn padded((lo, hi): (f64, f64), fallback: (f64, f64)) -> (f64, f64) {
    if !lo.is_finite() || !hi.is_finite() {
        return fallback;
    }
    let pad = ((hi - lo) * 0.05).max(0.5);
    (lo - pad, hi + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CleanedRecord, HostCategory, RoomType};
    use tempfile::TempDir;

    fn record(price: f64, rating: Option<f64>) -> EnrichedRecord {
        EnrichedRecord {
            listing: CleanedRecord {
                id: format!("{price}-{rating:?}"),
                name: None,
                neighborhood_group: None,
                neighborhood: None,
                room_type: RoomType::PrivateRoom,
                price,
                service_fee: 0.0,
                construction_year: None,
                number_of_reviews: 0,
                reviews_per_month: None,
                review_rating: rating,
                host_verification: None,
                availability_365: None,
                cancellation_policy: None,
            },
            days_booked: None,
            host_category: HostCategory::NonVerified,
        }
    }

    fn stats(key: &str, mean_price: f64) -> GroupStats {
        GroupStats {
            key: key.to_string(),
            count: 1,
            mean_price,
            metric_quantile: None,
        }
    }

    #[test]
    fn test_review_rate_points_filters() {
        let records = vec![
            record(100.0, Some(4.0)),
            record(0.0, Some(3.0)),
            record(200.0, None),
            record(10_000.0, Some(5.0)),
        ];
        // rated prices are 0, 100 and 10k, so the 0.5 quantile cap is 100
        let points = review_rate_points(&records, 0.5);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].0, 4.0);
        assert!((points[0].1 - 100f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_price_cap_ignores_unrated_listings() {
        let records = vec![
            record(100.0, Some(3.0)),
            record(200.0, Some(4.0)),
            record(1000.0, None),
            record(1000.0, None),
            record(1000.0, None),
        ];
        // median of the rated prices is 150; unrated listings would lift it to 1000
        let points = review_rate_points(&records, 0.5);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].0, 3.0);
        assert!((points[0].1 - 100f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_review_rate_fit_requires_distinct_ratings() {
        assert!(review_rate_fit(&[(3.0, 4.0), (3.0, 5.0)]).is_none());
        assert!(review_rate_fit(&[(3.0, 4.0), (4.0, 5.0)]).is_some());
    }

    #[test]
    fn test_year_trend_writes_svg() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), ChartStyle::default());

        let artifact = renderer
            .construction_year_trend(&[(2003, 4), (2004, 7), (2010, 2)])
            .unwrap();

        assert_eq!(artifact.data_points, 3);
        assert_eq!(artifact.path, dir.path().join("construction_year_trend.svg"));
        let svg = fs::read_to_string(&artifact.path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_empty_charts_still_render() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), ChartStyle::default());

        renderer.construction_year_trend(&[]).unwrap();
        renderer
            .neighborhood_bars(ChartKind::TopExpensiveNeighborhoods, "Top", &[])
            .unwrap();
        renderer
            .category_boxplot(ChartKind::PriceByRoomType, "Price", "Price ($)", &[])
            .unwrap();
        renderer.review_rate_scatter(&[], None).unwrap();

        for kind in [
            ChartKind::ConstructionYearTrend,
            ChartKind::TopExpensiveNeighborhoods,
            ChartKind::PriceByRoomType,
            ChartKind::ReviewRateVsLogPrice,
        ] {
            assert!(dir.path().join(kind.file_name()).exists());
        }
    }

    #[test]
    fn test_bars_and_boxplot_with_data() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), ChartStyle::default());

        let bars = renderer
            .neighborhood_bars(
                ChartKind::TopCheapestNeighborhoods,
                "Cheapest",
                &[stats("Astoria", 50.0), stats("Harlem", 80.0)],
            )
            .unwrap();
        assert_eq!(bars.data_points, 2);

        let distributions = vec![
            ("Entire home/apt".to_string(), vec![100.0, 200.0, 300.0]),
            ("Hotel room".to_string(), vec![]),
            ("Private room".to_string(), vec![50.0, 80.0]),
        ];
        let boxes = renderer
            .category_boxplot(ChartKind::PriceByRoomType, "Price", "Price ($)", &distributions)
            .unwrap();
        assert_eq!(boxes.data_points, 2);
    }

    #[test]
    fn test_scatter_with_fit() {
        let dir = TempDir::new().unwrap();
        let renderer = ChartRenderer::new(dir.path(), ChartStyle::default());
        let points = vec![(1.0, 4.0), (2.0, 4.5), (3.0, 5.0)];
        let fit = review_rate_fit(&points);

        let artifact = renderer.review_rate_scatter(&points, fit.as_ref()).unwrap();
        assert_eq!(artifact.data_points, 3);
    }
}
