//! Model artifact: one bincode stream holding a header (magic and format
//! version) followed by the configuration, vocabulary and count tables.

use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::lda::{LdaConfig, TopicModel};
use crate::vocab::Vocabulary;

pub const MAGIC: [u8; 8] = *b"TOPICLDA";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: [u8; 8],
    version: u32,
}

#[derive(Serialize)]
struct BodyRef<'a> {
    config: &'a LdaConfig,
    words: &'a [String],
    doc_topic: &'a [Vec<u32>],
    topic_word: &'a [Vec<u32>],
    topic_totals: &'a [u32],
}

#[derive(Deserialize)]
struct Body {
    config: LdaConfig,
    words: Vec<String>,
    doc_topic: Vec<Vec<u32>>,
    topic_word: Vec<Vec<u32>>,
    topic_totals: Vec<u32>,
}

/// Write the artifact next to its destination first and move it into place,
/// so a failed save never leaves a truncated file behind.
pub fn save_model(path: &Path, model: &TopicModel) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    create_dir_all(dir)?;
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        bincode::serialize_into(&mut writer, &Header { magic: MAGIC, version: FORMAT_VERSION })?;
        let body = BodyRef {
            config: &model.config,
            words: model.vocabulary.words(),
            doc_topic: &model.doc_topic,
            topic_word: &model.topic_word,
            topic_totals: &model.topic_totals,
        };
        bincode::serialize_into(&mut writer, &body)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    tracing::debug!(path = %path.display(), vocab = model.vocabulary.len(), "model saved");
    Ok(())
}

/// Read and validate an artifact. Nothing is built until the header, the
/// body and the table invariants have all checked out.
pub fn load_model(path: &Path) -> Result<TopicModel> {
    let mut f = File::open(path).map_err(|e| Error::model_load(path, e))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(|e| Error::model_load(path, e))?;

    let mut cursor = buf.as_slice();
    let header: Header = bincode::deserialize_from(&mut cursor)
        .map_err(|e| Error::model_load(path, format!("unreadable header: {e}")))?;
    if header.magic != MAGIC {
        return Err(Error::model_load(path, "not a topic model artifact"));
    }
    if header.version != FORMAT_VERSION {
        return Err(Error::model_load(
            path,
            format!("format version {} is not supported (expected {FORMAT_VERSION})", header.version),
        ));
    }
    let body: Body = bincode::deserialize_from(&mut cursor)
        .map_err(|e| Error::model_load(path, format!("unreadable body: {e}")))?;
    if !cursor.is_empty() {
        return Err(Error::model_load(path, format!("{} trailing bytes", cursor.len())));
    }

    body.config.validate().map_err(|e| Error::model_load(path, e))?;
    let vocabulary = Vocabulary::from_words(body.words)
        .ok_or_else(|| Error::model_load(path, "vocabulary lists a word twice"))?;
    let model = TopicModel {
        config: body.config,
        vocabulary,
        doc_topic: body.doc_topic,
        topic_word: body.topic_word,
        topic_totals: body.topic_totals,
    };
    model.check_consistency().map_err(|reason| Error::model_load(path, reason))?;
    tracing::debug!(path = %path.display(), bytes = buf.len(), "model loaded");
    Ok(model)
}
