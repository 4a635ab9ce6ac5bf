// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading content documents and libraries.

use crate::document::Document;
use crate::error::DocumentError;
use crate::modifiers::DocumentModifiers;
use crate::renderable::{find_renderable_elements, RenderableElement};
use crate::resolve::{remap_unimplemented_shader_refs, ImplementationTarget};
use crate::search_path::FileSearchPath;
use crate::xml::{read_document, read_document_from_str, ReadOptions};
use std::path::Path;
use walkdir::WalkDir;

/// File extension of material documents
pub const DOCUMENT_EXTENSION: &str = "mtlx";

/// One drawable instantiation of a renderable element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSubset {
    /// The renderable element
    pub element: RenderableElement,
    /// UDIM tile this subset draws, if the document declares a UDIM set
    pub udim: Option<String>,
}

impl MaterialSubset {
    /// Display label, `path` or `path (udim)`
    pub fn label(&self) -> String {
        match &self.udim {
            Some(udim) => format!("{} ({})", self.element.path, udim),
            None => self.element.path.clone(),
        }
    }
}

/// A content document merged with its libraries
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// The merged document
    pub document: Document,
    /// Renderable subsets, in discovery order
    pub subsets: Vec<MaterialSubset>,
}

/// Load every document of the given library folders into one document
///
/// Folders are resolved against the search path. Files are read in name
/// order and merged with first-definition-wins semantics.
pub fn load_libraries(folders: &[String], search_path: &FileSearchPath) -> Result<Document, DocumentError> {
    let mut libraries = Document::new();
    let options = ReadOptions {
        include_search_path: search_path.clone(),
        ..Default::default()
    };

    for folder in folders {
        let dir = search_path.find(folder);
        if !dir.is_dir() {
            tracing::warn!("Library folder not found: {}", folder);
            continue;
        }

        let files = WalkDir::new(&dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION)
            });

        for entry in files {
            let library = read_document(entry.path(), &options)?;
            let imported = libraries.import_library(&library);
            tracing::debug!("Imported {} elements from {:?}", imported, entry.path());
        }
    }

    tracing::info!("Loaded {} library elements", libraries.elements().len());
    Ok(libraries)
}

/// Loads content documents and prepares them for rendering
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    /// Directories searched for include targets
    pub include_search_path: FileSearchPath,
    /// Restrict implementation checks to a generator target
    pub target: Option<ImplementationTarget>,
}

impl DocumentLoader {
    /// Create a loader without target restrictions
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the include search path
    pub fn with_include_search_path(mut self, search_path: FileSearchPath) -> Self {
        self.include_search_path = search_path;
        self
    }

    /// Restrict implementation checks to a generator target
    pub fn with_target(mut self, target: ImplementationTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Load a content document from a file
    pub fn load_document(
        &self,
        path: &Path,
        stdlib: &Document,
        modifiers: &DocumentModifiers,
    ) -> Result<LoadedDocument, DocumentError> {
        let doc = read_document(path, &self.read_options())?;
        Ok(self.prepare(doc, stdlib, modifiers))
    }

    /// Load a content document from an XML string
    pub fn load_document_from_str(
        &self,
        xml: &str,
        stdlib: &Document,
        modifiers: &DocumentModifiers,
    ) -> Result<LoadedDocument, DocumentError> {
        let doc = read_document_from_str(xml, &self.read_options())?;
        Ok(self.prepare(doc, stdlib, modifiers))
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            include_search_path: self.include_search_path.clone(),
            ..Default::default()
        }
    }

    fn prepare(&self, mut doc: Document, stdlib: &Document, modifiers: &DocumentModifiers) -> LoadedDocument {
        modifiers.apply(&mut doc);
        doc.import_library(stdlib);
        remap_unimplemented_shader_refs(&mut doc, self.target.as_ref());

        let elements = find_renderable_elements(&doc, self.target.as_ref());
        let subsets = match doc.udim_set() {
            Some(udims) if !udims.is_empty() => elements
                .into_iter()
                .flat_map(|element| {
                    udims.iter().map(move |udim| MaterialSubset {
                        element: element.clone(),
                        udim: Some(udim.clone()),
                    })
                })
                .collect(),
            _ => elements
                .into_iter()
                .map(|element| MaterialSubset { element, udim: None })
                .collect::<Vec<_>>(),
        };

        tracing::info!(
            "Loaded document {:?} with {} material subsets",
            doc.source_path(),
            subsets.len()
        );
        LoadedDocument { document: doc, subsets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderable::RenderableKind;

    const STDLIB: &str = r#"<materialx>
        <nodedef name="ND_surf_old" node="surf" type="surfaceshader"/>
        <nodedef name="ND_surf" node="surf" type="surfaceshader"/>
        <implementation name="IM_surf" nodedef="ND_surf" language="genglsl" sourcecode="x"/>
        <nodedef name="ND_unimplemented" node="unimplemented" type="surfaceshader"/>
    </materialx>"#;

    fn stdlib() -> Document {
        read_document_from_str(STDLIB, &ReadOptions::default()).unwrap()
    }

    #[test]
    fn test_unimplemented_material_excluded() {
        let content = r#"<materialx>
            <material name="A"><shaderref name="sr" node="unimplemented"/></material>
            <material name="B"><shaderref name="sr" node="surf"/></material>
        </materialx>"#;
        let loader = DocumentLoader::new().with_target(ImplementationTarget::new("genglsl", "glsl"));
        let loaded = loader
            .load_document_from_str(content, &stdlib(), &DocumentModifiers::default())
            .unwrap();
        assert_eq!(loaded.subsets.len(), 1);
        assert_eq!(loaded.subsets[0].element.path, "B/sr");
        assert_eq!(loaded.subsets[0].element.kind, RenderableKind::ShaderRef);
    }

    #[test]
    fn test_resolution_never_reduces_resolvable_references() {
        let content = r#"<materialx>
            <material name="A"><shaderref name="sr" nodedef="ND_surf_old"/></material>
            <material name="B"><shaderref name="sr" nodedef="ND_surf"/></material>
            <material name="C"><shaderref name="sr" node="unimplemented"/></material>
        </materialx>"#;
        let loaded = DocumentLoader::new()
            .load_document_from_str(content, &stdlib(), &DocumentModifiers::default())
            .unwrap();
        let paths: Vec<_> = loaded.subsets.iter().map(|s| s.element.path.as_str()).collect();
        assert_eq!(paths, vec!["A/sr", "B/sr"]);
        assert_eq!(
            loaded.document.element("A/sr").unwrap().attribute("nodedef"),
            Some("ND_surf")
        );
    }

    #[test]
    fn test_udim_fan_out() {
        let content = r#"<materialx>
            <geominfo name="gi"><geomattr name="udimset" type="stringarray" value="1001,1002"/></geominfo>
            <material name="B"><shaderref name="sr" node="surf"/></material>
        </materialx>"#;
        let loaded = DocumentLoader::new()
            .load_document_from_str(content, &stdlib(), &DocumentModifiers::default())
            .unwrap();
        let udims: Vec<_> = loaded.subsets.iter().map(|s| s.udim.clone()).collect();
        assert_eq!(udims, vec![Some("1001".to_string()), Some("1002".to_string())]);
        assert_eq!(loaded.subsets[1].label(), "B/sr (1002)");
    }

    #[test]
    fn test_parse_error_propagates() {
        let result = DocumentLoader::new().load_document_from_str(
            "<materialx><material name=\"x\">",
            &stdlib(),
            &DocumentModifiers::default(),
        );
        assert!(matches!(result, Err(DocumentError::Parse { .. })));
    }

    #[test]
    fn test_load_libraries_from_folders() {
        let root = std::env::temp_dir().join(format!("mxview-lib-{}", uuid::Uuid::new_v4()));
        let stdlib_dir = root.join("stdlib");
        std::fs::create_dir_all(&stdlib_dir).unwrap();
        std::fs::write(
            stdlib_dir.join("a_defs.mtlx"),
            r#"<materialx><nodedef name="ND_x" node="x" type="float"/></materialx>"#,
        )
        .unwrap();
        std::fs::write(
            stdlib_dir.join("b_defs.mtlx"),
            r#"<materialx><nodedef name="ND_x" node="x" type="color3"/></materialx>"#,
        )
        .unwrap();
        std::fs::write(stdlib_dir.join("notes.txt"), "ignored").unwrap();

        let search_path = FileSearchPath::from(root.clone());
        let libs = load_libraries(&["stdlib".into(), "missing".into()], &search_path).unwrap();
        let nd = libs.node_def("ND_x").unwrap();
        assert_eq!(nd.type_string(), "float");
        assert!(nd.source_uri().unwrap().ends_with("a_defs.mtlx"));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
