//! IFC header loader.
//!
//! Reads an ISO-10303-21 (STEP physical file) model, validates its header and
//! summarizes the DATA section. Geometry is left to a real BIM parser; the
//! renderer only needs a node to attach.

use ifc_lite_core::{EntityDecoder, EntityScanner};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geolayer_render::{ModelNode, SceneNode};

use crate::{LoadError, ModelLoader};

const STEP_MAGIC: &str = "ISO-10303-21";

/// Summary of an IFC file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfcHeader {
    /// e.g. `IFC2X3`, `IFC4`.
    pub schema: String,
    pub file_name: Option<String>,
    pub project_name: Option<String>,
    pub entity_count: usize,
    /// Instances per entity type, upper-cased.
    pub entity_types: BTreeMap<String, usize>,
}

impl IfcHeader {
    /// Parse the text of an IFC file. `path` is only used in errors.
    pub fn parse(text: &str, path: &Path) -> Result<Self, LoadError> {
        let text = strip_comments(text);
        let (header, data) = split_header(&text);
        let mut header = header.into_iter();

        if header.next() != Some(STEP_MAGIC) {
            return Err(LoadError::NotIfc(path.to_path_buf()));
        }

        let mut schema = None;
        let mut file_name = None;
        for stmt in header {
            if let Some(rest) = stmt.strip_prefix("FILE_SCHEMA") {
                schema = first_quoted(rest);
            } else if let Some(rest) = stmt.strip_prefix("FILE_NAME") {
                file_name = first_quoted(rest);
            }
        }
        let schema = schema.ok_or_else(|| LoadError::MissingSchema(path.to_path_buf()))?;
        let data = data.ok_or_else(|| LoadError::MissingData(path.to_path_buf()))?;

        let mut scanner = EntityScanner::new(data);
        let mut decoder = EntityDecoder::new(data);
        let mut project_name = None;
        let mut entity_types: BTreeMap<String, usize> = BTreeMap::new();
        while let Some((id, type_name, start, end)) = scanner.next_entity() {
            let kind = type_name.to_ascii_uppercase();
            if kind == "IFCPROJECT" && project_name.is_none() {
                // IfcRoot.Name
                project_name = decoder
                    .decode_at_with_id(id, start, end)
                    .ok()
                    .and_then(|entity| {
                        entity.get(2).and_then(|a| a.as_string()).map(str::to_string)
                    });
            }
            *entity_types.entry(kind).or_default() += 1;
        }

        Ok(Self {
            schema,
            file_name,
            project_name,
            entity_count: entity_types.values().sum(),
            entity_types,
        })
    }
}

/// Loads IFC files into model nodes.
#[derive(Debug, Default)]
pub struct IfcLoader {
    runtime_path: Option<PathBuf>,
}

impl IfcLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runtime_path(&self) -> Option<&Path> {
        self.runtime_path.as_deref()
    }
}

impl ModelLoader for IfcLoader {
    async fn set_runtime_path(&mut self, path: &Path) -> Result<(), LoadError> {
        if !path.is_dir() {
            return Err(LoadError::RuntimeMissing(path.to_path_buf()));
        }
        tracing::debug!(path = %path.display(), "IFC runtime path set");
        self.runtime_path = Some(path.to_path_buf());
        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<SceneNode, LoadError> {
        if self.runtime_path.is_none() {
            return Err(LoadError::RuntimeNotConfigured);
        }
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let header = IfcHeader::parse(&text, path)?;

        let mut metadata = BTreeMap::new();
        metadata.insert("schema".to_string(), header.schema.clone());
        metadata.insert("sha256".to_string(), sha256_hex(&bytes));
        if let Some(name) = &header.file_name {
            metadata.insert("file_name".to_string(), name.clone());
        }

        let name = header
            .project_name
            .clone()
            .or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "model".to_string());

        tracing::info!(
            name = %name,
            schema = %header.schema,
            entities = header.entity_count,
            "IFC model loaded"
        );

        Ok(SceneNode::Model(ModelNode {
            name,
            source: path.to_path_buf(),
            entity_count: header.entity_count,
            metadata,
        }))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Remove `/* ... */` comments that sit outside string literals.
fn strip_comments(text: &str) -> Cow<'_, str> {
    if !text.contains("/*") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if !in_string && c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = '\0';
            for c in chars.by_ref() {
                if prev == '*' && c == '/' {
                    break;
                }
                prev = c;
            }
            out.push(' ');
            continue;
        }
        if c == '\'' {
            in_string = !in_string;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Header statements (magic included) up to `DATA;`, and the text after it.
///
/// STEP escapes quotes by doubling them, which toggles the string state
/// twice and leaves it unchanged.
fn split_header(text: &str) -> (Vec<&str>, Option<&str>) {
    let mut statements = Vec::new();
    let mut in_string = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            ';' if !in_string => {
                let stmt = text[start..i].trim();
                if stmt == "DATA" {
                    return (statements, Some(&text[i + 1..]));
                }
                statements.push(stmt);
                start = i + 1;
            }
            _ => {}
        }
    }
    (statements, None)
}

fn first_quoted(s: &str) -> Option<String> {
    let start = s.find('\'')? + 1;
    let bytes = s.as_bytes();
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(s[start..i].replace("''", "'"));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('01.ifc','2021-03-01T10:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#1=IFCPROJECT('2pQ8rT$0H0hO3m2wZ1a4fX',#2,'Casa do Largo; fase 1',$,$,$,$,(#9),#8);
#2=IFCOWNERHISTORY(#3,#4,$,.ADDED.,$,$,$,1614592800);
#10=IFCWALLSTANDARDCASE('0uA1b2',#2,'Wall-001',$,$,#11,#12,$);
#11=IFCWALLSTANDARDCASE('0uA1b3',#2,'Wall-002',$,$,#11,#12,$);
#12=IFCCARTESIANPOINT((0.,0.,0.));
ENDSEC;
END-ISO-10303-21;
";

    fn write_model(text: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::Builder::new().suffix(".ifc").tempfile().unwrap();
        tmp.write_all(text.as_bytes()).unwrap();
        tmp
    }

    #[test]
    fn parses_header_and_counts_entities() {
        let header = IfcHeader::parse(SAMPLE, Path::new("01.ifc")).unwrap();
        assert_eq!(header.schema, "IFC2X3");
        assert_eq!(header.file_name.as_deref(), Some("01.ifc"));
        assert_eq!(header.project_name.as_deref(), Some("Casa do Largo; fase 1"));
        assert_eq!(header.entity_count, 5);
        assert_eq!(header.entity_types["IFCWALLSTANDARDCASE"], 2);
        assert_eq!(header.entity_types["IFCPROJECT"], 1);
    }

    #[test]
    fn rejects_non_step_files() {
        let err = IfcHeader::parse("{\"asset\":{}}", Path::new("model.gltf")).unwrap_err();
        assert!(matches!(err, LoadError::NotIfc(_)));
    }

    #[test]
    fn missing_schema_is_error() {
        let text = "ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\nENDSEC;\nEND-ISO-10303-21;\n";
        let err = IfcHeader::parse(text, Path::new("x.ifc")).unwrap_err();
        assert!(matches!(err, LoadError::MissingSchema(_)));
    }

    #[test]
    fn missing_data_is_error() {
        let text = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nEND-ISO-10303-21;\n";
        let err = IfcHeader::parse(text, Path::new("x.ifc")).unwrap_err();
        assert!(matches!(err, LoadError::MissingData(_)));
    }

    #[test]
    fn unset_project_name_is_none() {
        let text = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n#1=IFCPROJECT('g',$,$,$,$,$,$,$,$);\nENDSEC;\n";
        let header = IfcHeader::parse(text, Path::new("x.ifc")).unwrap();
        assert_eq!(header.project_name, None);
        assert_eq!(header.entity_count, 1);
    }

    #[test]
    fn header_helpers() {
        assert_eq!(first_quoted("(('IFC4'))"), Some("IFC4".to_string()));
        assert_eq!(first_quoted("('it''s')"), Some("it's".to_string()));
        let (header, data) = split_header("A;'x;y';DATA;#1=X();");
        assert_eq!(header, vec!["A", "'x;y'"]);
        assert_eq!(data, Some("#1=X();"));
        assert_eq!(strip_comments("a/* b's */c"), "a c");
        assert_eq!(strip_comments("'/* kept */'"), "'/* kept */'");
    }

    #[test]
    fn comment_in_header_is_skipped() {
        let text = "ISO-10303-21;\nHEADER;\n/* exporter's note */\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n#1=IFCWALL('w',$,$,$,$,$,$,$,$);\nENDSEC;\nEND-ISO-10303-21;\n";
        let header = IfcHeader::parse(text, Path::new("c.ifc")).unwrap();
        assert_eq!(header.schema, "IFC4");
        assert_eq!(header.entity_count, 1);
    }

    #[test]
    fn comment_before_data_is_skipped() {
        let text = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\n/* model data */\nDATA;\n/* walls; first floor */\n#1=IFCWALL('w',$,$,$,$,$,$,$,$);\nENDSEC;\nEND-ISO-10303-21;\n";
        let header = IfcHeader::parse(text, Path::new("c.ifc")).unwrap();
        assert_eq!(header.entity_types["IFCWALL"], 1);
    }

    #[test]
    fn load_requires_runtime_path() {
        let model = write_model(SAMPLE);
        let loader = IfcLoader::new();
        let err = pollster::block_on(loader.load(model.path())).unwrap_err();
        assert!(matches!(err, LoadError::RuntimeNotConfigured));
    }

    #[test]
    fn runtime_path_must_exist() {
        let mut loader = IfcLoader::new();
        let err = pollster::block_on(loader.set_runtime_path(Path::new("/no/such/wasm/dir")))
            .unwrap_err();
        assert!(matches!(err, LoadError::RuntimeMissing(_)));
        assert!(loader.runtime_path().is_none());
    }

    #[test]
    fn load_produces_model_node() {
        let model = write_model(SAMPLE);
        let runtime = tempfile::tempdir().unwrap();
        let mut loader = IfcLoader::new();
        let node = pollster::block_on(async {
            loader.set_runtime_path(runtime.path()).await?;
            loader.load(model.path()).await
        })
        .unwrap();

        let SceneNode::Model(m) = node else {
            panic!("expected a model node");
        };
        assert_eq!(m.name, "Casa do Largo; fase 1");
        assert_eq!(m.entity_count, 5);
        assert_eq!(m.metadata["schema"], "IFC2X3");
        assert_eq!(m.metadata["sha256"].len(), 64);
        assert_eq!(m.source, model.path());
    }

    #[test]
    fn missing_model_file_is_io_error() {
        let runtime = tempfile::tempdir().unwrap();
        let mut loader = IfcLoader::new();
        let err = pollster::block_on(async {
            loader.set_runtime_path(runtime.path()).await?;
            loader.load(Path::new("/no/such/model.ifc")).await
        })
        .unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
