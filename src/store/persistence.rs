use oxrdf::{GraphName, Quad};
use oxttl::{NQuadsParser, NQuadsSerializer, TurtleParser};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{ExportError, ExportResult};

pub struct QuadLoader;

impl QuadLoader {
    /// Reads a Turtle file into default-graph quads.
    pub fn load_turtle(path: impl AsRef<Path>) -> ExportResult<Vec<Quad>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        TurtleParser::new()
            .for_reader(BufReader::new(file))
            .map(|triple| {
                triple
                    .map(|t| t.in_graph(GraphName::DefaultGraph))
                    .map_err(|e| parse_error(path, e))
            })
            .collect()
    }

    /// Reads an N-Quads file; a missing file reads as empty.
    pub fn load_nquads(path: impl AsRef<Path>) -> ExportResult<Vec<Quad>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        // generated subject IRIs carry the rule IRI after '#', which strict IRI parsing rejects
        NQuadsParser::new()
            .lenient()
            .for_reader(BufReader::new(file))
            .map(|quad| quad.map_err(|e| parse_error(path, e)))
            .collect()
    }
}

pub struct QuadWriter;

impl QuadWriter {
    /// Appends quads to an N-Quads file, creating it and its directory.
    pub fn append<'a>(path: impl AsRef<Path>, quads: impl IntoIterator<Item = &'a Quad>) -> ExportResult<()> {
        let path = path.as_ref();
        let mut quads = quads.into_iter().peekable();
        if quads.peek().is_none() {
            return Ok(());
        }
        ensure_parent(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        write_quads(BufWriter::new(file), quads)
    }

    /// Writes quads to a sibling temp file and renames it over `path`, so
    /// a failed write never leaves a truncated file behind.
    pub fn replace<'a>(path: impl AsRef<Path>, quads: impl IntoIterator<Item = &'a Quad>) -> ExportResult<()> {
        let path = path.as_ref();
        ensure_parent(path)?;
        let temp = temp_path(path);
        let written = File::create(&temp)
            .map_err(ExportError::from)
            .and_then(|file| write_quads(BufWriter::new(file), quads));
        if let Err(err) = written {
            let _ = fs::remove_file(&temp);
            return Err(err);
        }
        fs::rename(&temp, path)?;
        Ok(())
    }
}

fn write_quads<'a, W: Write>(writer: W, quads: impl IntoIterator<Item = &'a Quad>) -> ExportResult<()> {
    let mut serializer = NQuadsSerializer::new().for_writer(writer);
    for quad in quads {
        serializer.serialize_quad(quad)?;
    }
    serializer.finish().flush()?;
    Ok(())
}

fn ensure_parent(path: &Path) -> ExportResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> ExportError {
    ExportError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
