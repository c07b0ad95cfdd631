//! Cell edits on `.xlsx` packages
//!
//! Only the active worksheet part is re-serialized. Every other zip entry is
//! copied raw, so styles, shared strings, drawings and the remaining sheets
//! stay byte-identical to the source. The one exception is the calculation
//! chain: once a formula cell is overwritten it is stale, so it is dropped
//! together with its relationship and content-type entry.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::cell::{CellRange, CellRef};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// A worksheet inside the package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLocation {
    pub name: String,
    /// 1-based position in the workbook's sheet order
    pub index: usize,
    /// Zip entry holding the sheet XML
    pub part: String,
}

/// Write `values` into the active sheet of the workbook at `path`, replacing
/// the file atomically. Returns the sheet that was written.
pub fn write_cells(path: &Path, values: &BTreeMap<CellRef, String>) -> Result<SheetLocation> {
    let partial = path.with_extension("partial");
    match rewrite_package(path, &partial, values) {
        Ok(sheet) => {
            fs::rename(&partial, path).with_context(|| {
                format!("failed to replace {} with the updated copy", path.display())
            })?;
            Ok(sheet)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn rewrite_package(
    source: &Path,
    dest: &Path,
    values: &BTreeMap<CellRef, String>,
) -> Result<SheetLocation> {
    let file =
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("{} is not a valid xlsx package", source.display()))?;

    let sheet = active_sheet(&mut archive)?;
    let sheet_xml = read_entry(&mut archive, &sheet.part)?;
    let updated = set_cells(&sheet_xml, values)
        .with_context(|| format!("failed to update sheet '{}'", sheet.name))?;

    let mut replacements: HashMap<String, String> = HashMap::new();
    replacements.insert(sheet.part.clone(), updated.xml);
    let drop_calc_chain =
        updated.replaced_formula && archive.index_for_name(CALC_CHAIN_PART).is_some();
    if drop_calc_chain {
        debug!("Dropping {} after overwriting a formula cell", CALC_CHAIN_PART);
        let rels = read_entry(&mut archive, WORKBOOK_RELS_PART)?;
        replacements.insert(
            WORKBOOK_RELS_PART.to_string(),
            drop_elements(&rels, b"Relationship", |e| {
                attribute(e, b"Target").is_some_and(|t| resolve_part(&t) == CALC_CHAIN_PART)
            })?,
        );
        if archive.index_for_name(CONTENT_TYPES_PART).is_some() {
            let types = read_entry(&mut archive, CONTENT_TYPES_PART)?;
            replacements.insert(
                CONTENT_TYPES_PART.to_string(),
                drop_elements(&types, b"Override", |e| {
                    attribute(e, b"PartName").is_some_and(|p| p == format!("/{CALC_CHAIN_PART}"))
                })?,
            );
        }
    }

    let out = File::create(dest).with_context(|| format!("failed to create {}", dest.display()))?;
    let mut writer = ZipWriter::new(BufWriter::new(out));
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if drop_calc_chain && name == CALC_CHAIN_PART {
            continue;
        }
        match replacements.get(&name) {
            Some(content) => {
                let options = SimpleFileOptions::default().compression_method(entry.compression());
                drop(entry);
                writer.start_file(name.as_str(), options)?;
                writer.write_all(content.as_bytes())?;
            }
            None => writer.raw_copy_file(entry)?,
        }
    }
    let mut inner = writer.finish()?;
    inner.flush()?;

    Ok(sheet)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("package has no part '{name}'"))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .with_context(|| format!("part '{name}' is not valid UTF-8 XML"))?;
    Ok(content)
}

/// Resolve the sheet Excel shows first (`workbookView@activeTab`)
pub fn active_sheet<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<SheetLocation> {
    let workbook = read_entry(archive, WORKBOOK_PART)?;
    let rels = read_entry(archive, WORKBOOK_RELS_PART)?;

    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut active_tab = 0usize;
    let mut reader = Reader::from_str(&workbook);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let name = attribute(e, b"name").unwrap_or_default();
                    let rel_id = attribute(e, b"id")
                        .ok_or_else(|| anyhow!("sheet '{name}' has no relationship id"))?;
                    sheets.push((name, rel_id));
                }
                b"workbookView" => {
                    active_tab = attribute(e, b"activeTab")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let mut targets: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(e, b"Id"), attribute(e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if sheets.is_empty() {
        bail!("workbook has no sheets");
    }
    let position = if active_tab < sheets.len() { active_tab } else { 0 };
    let (name, rel_id) = &sheets[position];
    let target = targets
        .get(rel_id)
        .ok_or_else(|| anyhow!("no relationship target for sheet '{name}'"))?;

    Ok(SheetLocation {
        name: name.clone(),
        index: position + 1,
        part: resolve_part(target),
    })
}

/// Relationship targets are relative to `xl/` unless absolute
fn resolve_part(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn attribute(element: &BytesStart<'_>, local_name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local_name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn element_prefix(element: &BytesStart<'_>) -> String {
    element
        .name()
        .prefix()
        .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
        .unwrap_or_default()
}

/// Cells still to be written, by row then column
type Pending<'v> = BTreeMap<u32, BTreeMap<u32, &'v str>>;

/// A rewritten worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetUpdate {
    pub xml: String,
    /// At least one overwritten cell held a formula
    pub replaced_formula: bool,
}

/// Rewrite worksheet XML so each target cell holds its value as an inline
/// string. Existing cells keep their style index; missing rows and cells are
/// inserted in document order.
pub fn set_cells(xml: &str, values: &BTreeMap<CellRef, String>) -> Result<SheetUpdate> {
    let mut pending: Pending<'_> = BTreeMap::new();
    for (cell, value) in values {
        pending
            .entry(cell.row())
            .or_default()
            .insert(cell.column(), value.as_str());
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut prefix = String::new();
    let mut in_sheet_data = false;
    let mut current_row: Option<u32> = None;
    let mut last_row = 0u32;
    let mut last_column = 0u32;
    let mut saw_sheet_data = false;
    let mut replaced_formula = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Empty(e) if e.local_name().as_ref() == b"dimension" => {
                writer.write_event(Event::Empty(widen_dimension(e, values.keys())))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(e);
                in_sheet_data = true;
                saw_sheet_data = true;
                writer.write_event(event.clone())?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = element_prefix(e);
                saw_sheet_data = true;
                writer.write_event(Event::Start(e.clone()))?;
                flush_rows(&mut writer, &prefix, &mut pending, u32::MAX)?;
                writer.write_event(Event::End(BytesEnd::new(format!("{prefix}sheetData"))))?;
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"sheetData" => {
                flush_rows(&mut writer, &prefix, &mut pending, u32::MAX)?;
                in_sheet_data = false;
                writer.write_event(event.clone())?;
            }
            Event::Start(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let row = attribute(e, b"r")
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(last_row + 1);
                flush_rows(&mut writer, &prefix, &mut pending, row)?;
                current_row = Some(row);
                last_row = row;
                last_column = 0;
                writer.write_event(event.clone())?;
            }
            Event::Empty(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let row = attribute(e, b"r")
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(last_row + 1);
                flush_rows(&mut writer, &prefix, &mut pending, row)?;
                last_row = row;
                if pending.contains_key(&row) {
                    writer.write_event(Event::Start(e.clone()))?;
                    flush_cells(&mut writer, &prefix, &mut pending, row, u32::MAX)?;
                    writer.write_event(Event::End(BytesEnd::new(format!("{prefix}row"))))?;
                } else {
                    writer.write_event(event.clone())?;
                }
            }
            Event::End(e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                if let Some(row) = current_row.take() {
                    flush_cells(&mut writer, &prefix, &mut pending, row, u32::MAX)?;
                }
                writer.write_event(event.clone())?;
            }
            Event::Start(e) | Event::Empty(e)
                if in_sheet_data && e.local_name().as_ref() == b"c" =>
            {
                let row = current_row.unwrap_or(last_row);
                let column = attribute(e, b"r")
                    .and_then(|r| CellRef::parse_column(&r))
                    .unwrap_or(last_column + 1);
                last_column = column;
                flush_cells(&mut writer, &prefix, &mut pending, row, column)?;

                match take_cell(&mut pending, row, column) {
                    Some(value) => {
                        let style = attribute(e, b"s");
                        write_cell(
                            &mut writer,
                            &prefix,
                            CellRef::new(column, row)?,
                            style.as_deref(),
                            value,
                        )?;
                        if matches!(event, Event::Start(_)) {
                            replaced_formula |= skip_element(&mut reader)?;
                        }
                    }
                    None => writer.write_event(event.clone())?,
                }
            }
            _ => writer.write_event(event.clone())?,
        }
    }

    if !saw_sheet_data {
        bail!("worksheet has no sheetData element");
    }
    if !pending.is_empty() {
        bail!("worksheet ended before all target cells were written");
    }

    let xml = String::from_utf8(writer.into_inner()).context("rewritten worksheet is not UTF-8")?;
    Ok(SheetUpdate {
        xml,
        replaced_formula,
    })
}

/// Consume events up to and including the end of the element just opened.
/// Returns whether a formula (`f`) was among them.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<bool> {
    let mut depth = 1usize;
    let mut formula = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                formula |= e.local_name().as_ref() == b"f";
                depth += 1;
            }
            Event::Empty(e) => formula |= e.local_name().as_ref() == b"f",
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(formula);
                }
            }
            Event::Eof => bail!("unexpected end of worksheet inside a cell"),
            _ => {}
        }
    }
}

/// Copy `xml`, leaving out every `local_name` element matching `remove`
fn drop_elements(
    xml: &str,
    local_name: &[u8],
    remove: impl Fn(&BytesStart<'_>) -> bool,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Empty(e) if e.local_name().as_ref() == local_name && remove(e) => {}
            Event::Start(e) if e.local_name().as_ref() == local_name && remove(e) => {
                skip_element(&mut reader)?;
            }
            _ => writer.write_event(event.clone())?,
        }
    }
    String::from_utf8(writer.into_inner()).context("rewritten part is not UTF-8")
}

fn take_cell<'v>(pending: &mut Pending<'v>, row: u32, column: u32) -> Option<&'v str> {
    let cells = pending.get_mut(&row)?;
    let value = cells.remove(&column);
    if cells.is_empty() {
        pending.remove(&row);
    }
    value
}

/// Emit new rows for every pending row numbered below `before_row`
fn flush_rows(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    pending: &mut Pending<'_>,
    before_row: u32,
) -> Result<()> {
    while pending
        .first_key_value()
        .is_some_and(|(row, _)| *row < before_row)
    {
        let Some((row, cells)) = pending.pop_first() else {
            break;
        };
        let mut start = BytesStart::new(format!("{prefix}row"));
        start.push_attribute(("r", row.to_string().as_str()));
        writer.write_event(Event::Start(start))?;
        for (column, value) in cells {
            write_cell(writer, prefix, CellRef::new(column, row)?, None, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new(format!("{prefix}row"))))?;
    }
    Ok(())
}

/// Emit pending cells of `row` whose column is below `before_column`
fn flush_cells(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    pending: &mut Pending<'_>,
    row: u32,
    before_column: u32,
) -> Result<()> {
    let Some(cells) = pending.get_mut(&row) else {
        return Ok(());
    };
    while cells
        .first_key_value()
        .is_some_and(|(column, _)| *column < before_column)
    {
        let Some((column, value)) = cells.pop_first() else {
            break;
        };
        write_cell(writer, prefix, CellRef::new(column, row)?, None, value)?;
    }
    if cells.is_empty() {
        pending.remove(&row);
    }
    Ok(())
}

fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    cell: CellRef,
    style: Option<&str>,
    value: &str,
) -> Result<()> {
    let reference = cell.to_string();
    let mut start = BytesStart::new(format!("{prefix}c"));
    start.push_attribute(("r", reference.as_str()));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }
    start.push_attribute(("t", "inlineStr"));

    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Start(BytesStart::new(format!("{prefix}is"))))?;
    writer.write_event(Event::Start(BytesStart::new(format!("{prefix}t"))))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(format!("{prefix}t"))))?;
    writer.write_event(Event::End(BytesEnd::new(format!("{prefix}is"))))?;
    writer.write_event(Event::End(BytesEnd::new(format!("{prefix}c"))))?;
    Ok(())
}

/// Grow the `dimension` ref so it still covers every written cell
fn widen_dimension<'c>(
    element: &BytesStart<'_>,
    cells: impl Iterator<Item = &'c CellRef>,
) -> BytesStart<'static> {
    let Some(mut range) = attribute(element, b"ref").and_then(|r| r.parse::<CellRange>().ok())
    else {
        return element.clone().into_owned();
    };
    for cell in cells {
        range = range.expanded_to(*cell);
    }
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut widened = BytesStart::new(name);
    widened.push_attribute(("ref", range.to_string().as_str()));
    widened
}
