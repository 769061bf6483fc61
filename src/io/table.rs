// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Delimited-text annotation files.
//!
//! The primary dataset format: one header row, then one row per instance.
//! Columns are located by header name when reading; writing always uses
//! [`FIXED_COLUMNS`] followed by the schema's tag categories.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::instance::{Instance, Number};
use crate::models::schema::Schema;
use crate::models::tracked_object::TrackedObject;

pub const DELIMITER: char = ',';

/// Column order of written files, before the tag columns.
pub const FIXED_COLUMNS: [&str; 8] = [
    "frame_id",
    "track_id",
    "x1",
    "y1",
    "x2",
    "y2",
    "scene",
    "object_class",
];

const REQUIRED_COLUMNS: [&str; 7] = ["track_id", "object_class", "x1", "y1", "x2", "y2", "frame_id"];

/// Split one record into fields. Double-quoted fields may contain the
/// delimiter; a doubled quote inside them is a literal quote.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    quoted = false;
                }
            }
            '"' if field.is_empty() => quoted = true,
            c if c == DELIMITER && !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

pub fn escape_field(value: &str) -> String {
    if value.contains(DELIMITER) || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

struct Columns {
    index: BTreeMap<String, usize>,
    width: usize,
}

impl Columns {
    fn from_header(header: &str, schema: &Schema) -> Result<Self> {
        let names = split_record(header);
        let mut index = BTreeMap::new();
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.trim().to_string(), i).is_some() {
                return Err(Error::format(1, format!("duplicate column {name:?}")));
            }
        }
        let missing = REQUIRED_COLUMNS
            .iter()
            .copied()
            .chain(schema.tag_names())
            .find(|c| !index.contains_key(*c));
        if let Some(column) = missing {
            return Err(Error::format(1, format!("missing column {column:?}")));
        }
        Ok(Self {
            index,
            width: names.len(),
        })
    }

    fn get<'a>(&self, fields: &'a [String], name: &str) -> &'a str {
        // presence checked in from_header
        self.index.get(name).map_or("", |&i| fields[i].trim())
    }
}

fn parse_number(line: usize, column: &str, raw: &str) -> Result<Number> {
    Number::parse(raw)
        .ok_or_else(|| Error::format(line, format!("cannot convert {column}={raw:?} to a number")))
}

/// Parse an annotation table into typed instances, in file order.
///
/// Returned instances carry the file's track ids and are marked for
/// appending. Any malformed row aborts the whole read.
pub fn read_annotations(text: &str, schema: &Schema) -> Result<Vec<Instance>> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(Error::format(1, "missing header row"));
    };
    let columns = Columns::from_header(header, schema)?;

    let mut instances = Vec::new();
    for (line, record) in lines {
        let fields = split_record(record);
        if fields.len() != columns.width {
            return Err(Error::format(
                line,
                format!("expected {} fields, found {}", columns.width, fields.len()),
            ));
        }

        let raw_track = columns.get(&fields, "track_id");
        let track_id = raw_track
            .parse::<usize>()
            .map_err(|_| Error::format(line, format!("invalid track_id {raw_track:?}")))?;

        // fractional frame ids are truncated
        let raw_frame = columns.get(&fields, "frame_id");
        let frame_id = match raw_frame.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => v.trunc() as usize,
            _ => return Err(Error::format(line, format!("invalid frame_id {raw_frame:?}"))),
        };

        let mut bbox = [Number::Int(0); 4];
        for (slot, column) in bbox.iter_mut().zip(["x1", "y1", "x2", "y2"]) {
            *slot = parse_number(line, column, columns.get(&fields, column))?;
        }

        let mut instance = Instance::new(track_id, columns.get(&fields, "object_class"), frame_id, bbox);
        for category in schema.tag_names() {
            instance
                .tags
                .insert(category.to_string(), columns.get(&fields, category).to_string());
        }

        schema
            .validate(&instance)
            .map_err(|reason| Error::format(line, reason))?;
        instances.push(instance);
    }

    Ok(instances)
}

/// Render tracked objects as an annotation table.
pub fn write_annotations<'a>(
    objects: impl IntoIterator<Item = &'a TrackedObject>,
    schema: &Schema,
) -> String {
    let mut out = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(schema.tag_names())
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');

    let scene = escape_field(&schema.scene);
    for obj in objects {
        for ins in obj {
            let mut row = vec![
                ins.frame_id.to_string(),
                ins.track_id.to_string(),
                ins.x1.to_string(),
                ins.y1.to_string(),
                ins.x2.to_string(),
                ins.y2.to_string(),
                scene.clone(),
                escape_field(&ins.object_class),
            ];
            for category in schema.tag_names() {
                row.push(escape_field(ins.tags.get(category).map_or("", String::as_str)));
            }
            out.push_str(&row.join(","));
            out.push('\n');
        }
    }
    out
}
