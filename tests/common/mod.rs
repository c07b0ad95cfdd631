//! Shared fixtures: a small Panchangam workbook and fake collaborators

#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use panchangam::document::{CellRange, DocumentUpdater, SheetLocation};
use panchangam::geocoding::{Geocoder, GeocodingCandidate};
use panchangam::pipeline::{Pipeline, PipelineSettings};
use panchangam::render::RegionRenderer;
use panchangam::solar::{SolarDayEvents, SolarTimeCalculator, SolarTimeSource};
use panchangam::{Coordinates, LocationResolver, PipelineError, RenderFailure};
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

pub const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="0"/></bookViews><sheets><sheet name="Panchangam" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="B1:O32"/><sheetData><row r="1"><c r="B1" t="inlineStr"><is><t>Panchangam</t></is></c></row><row r="4"><c r="N4" t="inlineStr"><is><t>Sunrise</t></is></c><c r="O4" s="2" t="inlineStr"><is><t>00:00:00</t></is></c></row><row r="5"><c r="N5" t="inlineStr"><is><t>Sunset</t></is></c></row><row r="32"><c r="L32"><v>1</v></c></row></sheetData></worksheet>"#;

const CALC_CHAIN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><c r="O6" i="1"/></calcChain>"#;

/// Write the fixture workbook to `path`
pub fn write_workbook(path: &Path) {
    write_parts(
        path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            (SHEET_PART, SHEET),
        ],
    );
}

/// Like [`write_workbook`], but O6 holds a formula tracked by a calc chain
pub fn write_workbook_with_calc_chain(path: &Path) {
    let content_types = CONTENT_TYPES.replace(
        "</Types>",
        r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/></Types>"#,
    );
    let rels = WORKBOOK_RELS.replace(
        "</Relationships>",
        r#"<Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/></Relationships>"#,
    );
    let sheet = SHEET.replace(
        r#"<row r="32">"#,
        r#"<row r="6"><c r="O6" s="2"><f>O4+1</f><v>1.25</v></c></row><row r="32">"#,
    );
    write_parts(
        path,
        &[
            ("[Content_Types].xml", content_types.as_str()),
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", rels.as_str()),
            ("xl/calcChain.xml", CALC_CHAIN),
            (SHEET_PART, sheet.as_str()),
        ],
    );
}

fn write_parts(path: &Path, parts: &[(&str, &str)]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Names of every entry in the package
pub fn part_names(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Raw XML of one package part
pub fn read_part(path: &Path, part: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut content = String::new();
    archive
        .by_name(part)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}

/// Inline string value of `cell` in the fixture sheet
pub fn cell_text(path: &Path, cell: &str) -> Option<String> {
    let xml = read_part(path, SHEET_PART);
    let start = xml.find(&format!(r#"<c r="{cell}""#))?;
    let rest = &xml[start..];
    let end = rest.find("</c>")?;
    let element = &rest[..end];
    let text_start = element.find("<t>")? + 3;
    let text_end = element.find("</t>")?;
    Some(element[text_start..text_end].to_string())
}

pub fn target_cells() -> [panchangam::CellRef; 3] {
    ["O4".parse().unwrap(), "O5".parse().unwrap(), "O6".parse().unwrap()]
}

/// Answers from a fixed table; anything else has no match
pub struct FakeGeocoder {
    pub places: Vec<(&'static str, f64, f64)>,
}

impl FakeGeocoder {
    pub fn with_vijayawada() -> Self {
        Self {
            places: vec![("Vijayawada", 16.5062, 80.648)],
        }
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeocodingCandidate>, PipelineError> {
        Ok(self
            .places
            .iter()
            .filter(|(name, _, _)| name.eq_ignore_ascii_case(query))
            .map(|(name, latitude, longitude)| GeocodingCandidate {
                name: format!("{name}, India"),
                latitude: *latitude,
                longitude: *longitude,
            })
            .collect())
    }
}

/// Sunrise 00:15:00 UTC and sunset 12:45:00 UTC, with the next day's sunrise
/// ten seconds earlier
pub struct FixedSolarSource {
    pub reference: NaiveDate,
}

#[async_trait]
impl SolarTimeSource for FixedSolarSource {
    async fn day_events(
        &self,
        _coordinates: Coordinates,
        date: NaiveDate,
    ) -> Result<SolarDayEvents, PipelineError> {
        let sunrise = if date > self.reference {
            date.and_hms_opt(0, 14, 50).unwrap()
        } else {
            date.and_hms_opt(0, 15, 0).unwrap()
        };
        Ok(SolarDayEvents {
            sunrise: Utc.from_utc_datetime(&sunrise),
            sunset: Utc.from_utc_datetime(&date.and_hms_opt(12, 45, 0).unwrap()),
        })
    }
}

/// Every lookup fails the way a polar night does
pub struct PolarNightSource;

#[async_trait]
impl SolarTimeSource for PolarNightSource {
    async fn day_events(
        &self,
        _coordinates: Coordinates,
        date: NaiveDate,
    ) -> Result<SolarDayEvents, PipelineError> {
        Err(PipelineError::service(format!("there is no sunrise on {date}")))
    }
}

/// Fails every render with the given failure
pub struct FailingRenderer(pub RenderFailure);

#[async_trait]
impl RegionRenderer for FailingRenderer {
    async fn render(
        &self,
        _workbook: &Path,
        _sheet: &SheetLocation,
        _region: CellRange,
        _output: &Path,
    ) -> Result<PathBuf, PipelineError> {
        Err(self.0.clone().into())
    }
}

/// Never finishes
pub struct HangingRenderer;

#[async_trait]
impl RegionRenderer for HangingRenderer {
    async fn render(
        &self,
        _workbook: &Path,
        _sheet: &SheetLocation,
        _region: CellRange,
        _output: &Path,
    ) -> Result<PathBuf, PipelineError> {
        std::future::pending().await
    }
}

/// Number of files left in the working directory
pub fn working_files(dir: &Path) -> usize {
    std::fs::read_dir(dir.join("work"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// One render call as the renderer saw it
#[derive(Debug, Clone)]
pub struct RenderCall {
    pub workbook: PathBuf,
    pub sheet: SheetLocation,
    pub region: CellRange,
    pub output: PathBuf,
    /// Target-cell values of the working copy at render time
    pub cells: [Option<String>; 3],
}

/// Writes a placeholder image and records every call
#[derive(Default)]
pub struct RecordingRenderer {
    pub calls: Mutex<Vec<RenderCall>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegionRenderer for RecordingRenderer {
    async fn render(
        &self,
        workbook: &Path,
        sheet: &SheetLocation,
        region: CellRange,
        output: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let cells = ["O4", "O5", "O6"].map(|cell| cell_text(workbook, cell));
        std::fs::write(output, b"\x89PNG\r\n\x1a\n").unwrap();
        self.calls.lock().unwrap().push(RenderCall {
            workbook: workbook.to_path_buf(),
            sheet: sheet.clone(),
            region,
            output: output.to_path_buf(),
            cells,
        });
        Ok(output.to_path_buf())
    }
}

/// A pipeline over the fixture workbook in `dir` with fake collaborators
pub fn pipeline(
    dir: &Path,
    reference: NaiveDate,
    renderer: Arc<dyn RegionRenderer>,
) -> Pipeline {
    pipeline_with(
        dir,
        Arc::new(FixedSolarSource { reference }),
        renderer,
        Duration::from_secs(10),
    )
}

/// Like [`pipeline`], with the solar source and stage timeout chosen by the test
pub fn pipeline_with(
    dir: &Path,
    source: Arc<dyn SolarTimeSource>,
    renderer: Arc<dyn RegionRenderer>,
    stage_timeout: Duration,
) -> Pipeline {
    Pipeline::new(
        LocationResolver::new(Arc::new(FakeGeocoder::with_vijayawada())),
        SolarTimeCalculator::new(source),
        DocumentUpdater::new(dir.join("Panchangam.xlsx"), dir.join("work"), target_cells()),
        renderer,
        PipelineSettings {
            timezone: chrono_tz::Asia::Kolkata,
            region: "B1:L32".parse().unwrap(),
            output_path: dir.join("out").join("panchangam.png"),
            stage_timeout,
        },
    )
}
