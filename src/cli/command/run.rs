use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use tempfile::TempDir;

use crate::{
    cli::create_progress_bar,
    config::Config,
    download::make_client,
    flux::{compute_series, mm_per_day_to_m_per_s, DailyFlux, Input},
    parquet::{self, Layer},
    report::{point_series, save_point_series, save_statistics, statistics_rows},
    source::{CapaSource, Series, SnodasSource, Sources},
};

/// What a run computed, skipped and wrote.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub computed: Vec<NaiveDate>,
    pub skipped: Vec<(NaiveDate, Vec<Input>)>,
    pub files: Vec<PathBuf>,
}

pub async fn run(config: &Config) -> Result<RunSummary> {
    let sources = Sources {
        client: make_client()?,
        snodas: SnodasSource::new(&config.snodas_url, config.bbox),
        capa: CapaSource::new(&config.capa_template, config.bbox),
    };

    run_with_sources(config, &sources).await
}

pub async fn run_with_sources(config: &Config, sources: &Sources) -> Result<RunSummary> {
    config.log();

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    let tmp_dir = TempDir::new()?;

    let precipitation = sources
        .fetch_precipitation(config.range, tmp_dir.path())
        .await
        .context("Failed to fetch CaPA precipitation")?;

    // SWE is resampled onto the precipitation grid
    let (swe, fluxes) = match precipitation.values().next().map(|raster| raster.grid) {
        Some(target) => {
            let swe = sources
                .fetch_swe(config.range.with_previous_day(), &target, tmp_dir.path())
                .await
                .context("Failed to fetch SNODAS SWE")?;
            let fluxes = compute_series(config.range, &swe, &precipitation)?;
            (swe, fluxes)
        }
        None => {
            warn!("No CaPA precipitation in range, skipping every date");
            let fluxes: Vec<DailyFlux> = config
                .range
                .map(|date| DailyFlux::Skipped {
                    date,
                    missing: vec![Input::Precipitation],
                })
                .collect();
            (Series::new(), fluxes)
        }
    };

    let mut summary = summarise(&fluxes);

    let (start, end) = (config.range.start(), config.range.end());

    match config.point {
        Some(point) => {
            let file_path = config.output_dir.join(format!(
                "lwf-timeseries-{}-{}-{}-{}.csv",
                point.lat, point.lon, start, end
            ));
            save_point_series(&file_path, &point_series(&fluxes, point)?)?;
            summary.files.push(file_path);
        }
        None => {
            summary
                .files
                .extend(save_fluxes(&config.output_dir, &fluxes)?);

            if config.save_inputs {
                summary
                    .files
                    .extend(save_series(&config.output_dir, "swe", &swe)?);
                summary
                    .files
                    .extend(save_series(&config.output_dir, "precip", &precipitation)?);
            }
        }
    }

    let file_path = config
        .output_dir
        .join(format!("lwf-statistics-{}-{}.csv", start, end));
    save_statistics(&file_path, &statistics_rows(&fluxes))?;
    summary.files.push(file_path);

    log_summary(&summary);

    if config.strict && !summary.skipped.is_empty() {
        bail!(
            "{} date(s) skipped for missing data: {}",
            summary.skipped.len(),
            join_dates(summary.skipped.iter().map(|(date, _)| *date))
        );
    }

    Ok(summary)
}

fn summarise(fluxes: &[DailyFlux]) -> RunSummary {
    let mut summary = RunSummary::default();

    for flux in fluxes {
        match flux {
            DailyFlux::Computed { date, .. } => summary.computed.push(*date),
            DailyFlux::Skipped { date, missing } => summary.skipped.push((*date, missing.clone())),
        }
    }

    summary
}

fn save_fluxes(output_dir: &Path, fluxes: &[DailyFlux]) -> Result<Vec<PathBuf>> {
    let pb = create_progress_bar(fluxes.len() as u64, "Writing LWF rasters".to_string());
    let mut files = Vec::new();

    for flux in fluxes {
        pb.inc(1);
        let DailyFlux::Computed { date, lwf } = flux else {
            continue;
        };

        let m_s: Vec<f32> = lwf
            .data
            .iter()
            .map(|&v| mm_per_day_to_m_per_s(v as f64) as f32)
            .collect();

        let file_path = output_dir.join(format!("lwf-{}.parquet", date));
        parquet::save_raster(
            &file_path,
            *date,
            &lwf.grid,
            &[
                Layer {
                    name: "lwf_mm_day",
                    values: &lwf.data,
                },
                Layer {
                    name: "lwf_m_s",
                    values: &m_s,
                },
            ],
        )
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

        info!("Saved {}", file_path.display());
        files.push(file_path);
    }

    pb.finish_with_message(format!("Wrote {} LWF raster(s)", files.len()));

    Ok(files)
}

fn save_series(output_dir: &Path, prefix: &str, series: &Series) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for (date, raster) in series {
        let file_path = output_dir.join(format!("{}-{}.parquet", prefix, date));
        parquet::save_raster(
            &file_path,
            *date,
            &raster.grid,
            &[Layer {
                name: "value",
                values: &raster.data,
            }],
        )
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

        files.push(file_path);
    }

    info!("Saved {} {} raster(s)", files.len(), prefix);

    Ok(files)
}

fn log_summary(summary: &RunSummary) {
    info!(
        "Computed LWF for {} date(s), skipped {}",
        summary.computed.len(),
        summary.skipped.len()
    );

    for (date, missing) in &summary.skipped {
        let missing: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
        warn!("Skipped {}: missing {}", date, missing.join(", "));
    }
}

fn join_dates(dates: impl Iterator<Item = NaiveDate>) -> String {
    dates.map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::{fs::File, io::Write};

    use flate2::{write::GzEncoder, Compression};
    use reqwest::Client;

    use super::*;
    use crate::{
        date_range::DateRange,
        raster::{BoundingBox, Grid},
        report::Point,
    };

    fn small_grid() -> Grid {
        Grid {
            ncols: 4,
            nrows: 3,
            west: -110.0,
            north: 52.0,
            dx: 1.0,
            dy: 1.0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        if d == 0 {
            NaiveDate::from_ymd_opt(2025, 5, 31).unwrap()
        } else {
            NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
        }
    }

    /// Writes a SNODAS archive for `date` into a mirror rooted at `base`.
    fn write_snodas(base: &Path, date: NaiveDate, value: i16) {
        let dir = base.join(date.format("%Y/%m_%b").to_string());
        fs::create_dir_all(&dir).unwrap();

        let bytes: Vec<u8> = vec![value; 12].iter().flat_map(|v| v.to_be_bytes()).collect();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        let member = encoder.finish().unwrap();

        let file = File::create(dir.join(format!("SNODAS_unmasked_{}.tar", date.format("%Y%m%d")))).unwrap();
        let mut builder = tar::Builder::new(file);
        let mut header = tar::Header::new_gnu();
        header.set_size(member.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        let name = format!("us_ssmv11034tS__T0001TTNATS{}05HP001.dat.gz", date.format("%Y%m%d"));
        builder.append_data(&mut header, name, member.as_slice()).unwrap();
        builder.finish().unwrap();
    }

    fn write_capa(base: &Path, date: NaiveDate, value: f32) {
        let mut text = "ncols 4\nnrows 3\nxllcorner -110.0\nyllcorner 49.0\ncellsize 1.0\nNODATA_value -9999\n".to_string();
        for _ in 0..3 {
            text.push_str(&format!("{v} {v} {v} {v}\n", v = value));
        }
        fs::write(base.join(format!("CaPA_{}.asc", date.format("%Y%m%d"))), text).unwrap();
    }

    struct Fixture {
        dir: TempDir,
        config: Config,
        sources: Sources,
    }

    /// SWE 10 then 7 mm, no SWE on the second day, 3 and 1 mm of rain.
    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let snodas_dir = dir.path().join("snodas");
        let capa_dir = dir.path().join("capa");
        fs::create_dir_all(&capa_dir).unwrap();

        write_snodas(&snodas_dir, day(0), 10);
        write_snodas(&snodas_dir, day(1), 7);
        write_capa(&capa_dir, day(1), 3.0);
        write_capa(&capa_dir, day(2), 1.0);

        let snodas_url = snodas_dir.display().to_string();
        let capa_template = format!("{}/CaPA_{{date}}.asc", capa_dir.display());
        let bbox = BoundingBox::default();

        let config = Config {
            range: DateRange(day(1), day(2)),
            output_dir: dir.path().join("out"),
            bbox,
            snodas_url: snodas_url.clone(),
            capa_template: capa_template.clone(),
            point: None,
            save_inputs: false,
            strict: false,
        };
        let sources = Sources {
            client: Client::new(),
            snodas: SnodasSource::new(&snodas_url, bbox).with_grid(small_grid()),
            capa: CapaSource::new(&capa_template, bbox),
        };

        Fixture {
            dir,
            config,
            sources,
        }
    }

    #[tokio::test]
    async fn should_compute_available_dates_and_skip_the_rest() {
        let fixture = fixture();
        let out = fixture.config.output_dir.clone();

        let summary = run_with_sources(&fixture.config, &fixture.sources)
            .await
            .unwrap();

        assert_eq!(summary.computed, vec![day(1)]);
        assert_eq!(summary.skipped, vec![(day(2), vec![Input::Swe])]);
        assert!(out.join("lwf-2025-06-01.parquet").exists());
        assert!(!out.join("lwf-2025-06-02.parquet").exists());
        assert!(!out.join("swe-2025-06-01.parquet").exists());

        let statistics = fs::read_to_string(out.join("lwf-statistics-2025-06-01-2025-06-02.csv")).unwrap();
        let lines: Vec<&str> = statistics.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2025-06-01,12,6.0,6.0,6.0,0.0,"));
        assert!(lines[2].starts_with("all,12,6.0,"));
    }

    #[tokio::test]
    async fn should_save_inputs_when_asked() {
        let mut fixture = fixture();
        fixture.config.save_inputs = true;
        let out = fixture.config.output_dir.clone();

        let summary = run_with_sources(&fixture.config, &fixture.sources)
            .await
            .unwrap();

        assert!(out.join("swe-2025-05-31.parquet").exists());
        assert!(out.join("swe-2025-06-01.parquet").exists());
        assert!(out.join("precip-2025-06-01.parquet").exists());
        assert!(out.join("precip-2025-06-02.parquet").exists());
        assert_eq!(summary.files.len(), 6);
    }

    #[tokio::test]
    async fn should_fail_in_strict_mode_after_writing_computed_dates() {
        let mut fixture = fixture();
        fixture.config.strict = true;
        let out = fixture.config.output_dir.clone();

        let result = run_with_sources(&fixture.config, &fixture.sources).await;

        assert!(result.is_err());
        assert!(out.join("lwf-2025-06-01.parquet").exists());
    }

    #[tokio::test]
    async fn should_write_point_series_instead_of_rasters() {
        let mut fixture = fixture();
        fixture.config.point = Some(Point {
            lat: 51.5,
            lon: -109.5,
        });
        let out = fixture.config.output_dir.clone();

        run_with_sources(&fixture.config, &fixture.sources)
            .await
            .unwrap();

        let series =
            fs::read_to_string(out.join("lwf-timeseries-51.5--109.5-2025-06-01-2025-06-02.csv")).unwrap();
        let lines: Vec<&str> = series.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("2025-06-01,6.0,"));
        assert!(!out.join("lwf-2025-06-01.parquet").exists());
    }

    #[tokio::test]
    async fn should_skip_every_date_without_precipitation() {
        let fixture = fixture();
        let mut config = fixture.config.clone();
        config.capa_template = format!("{}/missing/CaPA_{{date}}.asc", fixture.dir.path().display());
        let sources = Sources {
            client: Client::new(),
            snodas: SnodasSource::new(&config.snodas_url, config.bbox).with_grid(small_grid()),
            capa: CapaSource::new(&config.capa_template, config.bbox),
        };

        let summary = run_with_sources(&config, &sources).await.unwrap();

        assert!(summary.computed.is_empty());
        assert_eq!(
            summary.skipped,
            vec![
                (day(1), vec![Input::Precipitation]),
                (day(2), vec![Input::Precipitation])
            ]
        );

        let statistics = fs::read_to_string(
            config
                .output_dir
                .join("lwf-statistics-2025-06-01-2025-06-02.csv"),
        )
        .unwrap();
        assert_eq!(statistics.lines().count(), 1);
        assert!(statistics.starts_with("period,cells,mean_mm_day,"));
    }
}
