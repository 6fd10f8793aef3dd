//! Maven `pom.xml` namespace lookup.

use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info};

use crate::ports::BuildDescriptorReader;

pub const DEFAULT_DESCRIPTOR: &str = "pom.xml";

/// Reads the project's `groupId` and turns it into an internal-form package prefix.
#[derive(Debug, Clone)]
pub struct MavenPomReader {
    file_name: String,
}

impl MavenPomReader {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Default for MavenPomReader {
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTOR)
    }
}

impl BuildDescriptorReader for MavenPomReader {
    fn namespace(&self, root: &Path) -> Option<String> {
        let path = root.join(&self.file_name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                info!("No build descriptor at {}: {}", path.display(), e);
                return None;
            }
        };
        match parse_group_id(&content) {
            Ok(Some(group)) => {
                let namespace = group.replace('.', "/");
                debug!("Namespace for {} is {}", root.display(), namespace);
                Some(namespace)
            }
            Ok(None) => {
                info!("No groupId declared in {}", path.display());
                None
            }
            Err(e) => {
                info!("Unable to parse {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// `project/groupId`, falling back to `project/parent/groupId`.
pub fn parse_group_id(content: &str) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut own = None;
    let mut parent = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(ref e)) => {
                let slot = match stack.as_slice() {
                    [project, group] if project == "project" && group == "groupId" => Some(&mut own),
                    [project, parent_tag, group]
                        if project == "project" && parent_tag == "parent" && group == "groupId" =>
                    {
                        Some(&mut parent)
                    }
                    _ => None,
                };
                if let Some(slot) = slot {
                    let text = e.unescape().map_err(|e| e.to_string())?.trim().to_string();
                    if !text.is_empty() {
                        *slot = Some(text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(own.or(parent))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <!-- <groupId>com.commented</groupId> -->
    <parent>
        <groupId>org.springframework.boot</groupId>
        <artifactId>spring-boot-starter-parent</artifactId>
    </parent>
    <groupId>com.acme.shop</groupId>
    <artifactId>orders</artifactId>
    <dependencies>
        <dependency>
            <groupId>com.other</groupId>
        </dependency>
    </dependencies>
</project>"#;

    #[test]
    fn test_own_group_id_wins() {
        assert_eq!(parse_group_id(POM).unwrap().as_deref(), Some("com.acme.shop"));
    }

    #[test]
    fn test_parent_group_id_fallback() {
        let pom = r#"<project><parent><groupId>com.acme</groupId></parent><artifactId>x</artifactId></project>"#;
        assert_eq!(parse_group_id(pom).unwrap().as_deref(), Some("com.acme"));
    }

    #[test]
    fn test_dependency_group_ids_ignored() {
        let pom = r#"<project><dependencies><dependency><groupId>com.x</groupId></dependency></dependencies></project>"#;
        assert_eq!(parse_group_id(pom).unwrap(), None);
    }

    #[test]
    fn test_reader_converts_to_internal_form() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pom.xml"), POM).unwrap();
        let reader = MavenPomReader::default();
        assert_eq!(reader.namespace(dir.path()).as_deref(), Some("com/acme/shop"));
    }

    #[test]
    fn test_missing_or_broken_descriptor_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let reader = MavenPomReader::default();
        assert_eq!(reader.namespace(dir.path()), None);

        fs::write(dir.path().join("pom.xml"), "<project><groupId>a</project>").unwrap();
        assert_eq!(reader.namespace(dir.path()), None);
    }
}
