/// Package implementation for PowerPoint presentations.
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::{OpcPackage, PackURI};
use crate::ooxml::pptx::presentation::Presentation;
use std::io::{Read, Seek};
use std::path::Path;

/// Main-part content types accepted as a presentation.
const PRESENTATION_TYPES: [&str; 4] = [
    ct::PML_PRESENTATION_MAIN,
    ct::PML_PRES_MACRO_MAIN,
    ct::PML_TEMPLATE_MAIN,
    ct::PML_SLIDESHOW_MAIN,
];

/// A PowerPoint (.pptx) package.
///
/// This is the entry point for queries, element mutation and merging. It
/// wraps an OPC package whose main document is a presentation part.
///
/// # Examples
///
/// ```rust,no_run
/// use quince::ooxml::pptx::Package;
///
/// let pkg = Package::open("presentation.pptx")?;
/// println!("{} slides", pkg.slide_partnames()?.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Package {
    opc: OpcPackage,
    main: PackURI,
}

impl Package {
    /// Open a .pptx package from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_opc(OpcPackage::open(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_opc(OpcPackage::from_bytes(data)?)
    }

    /// Create a .pptx package from a reader (must implement Read + Seek).
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_opc(OpcPackage::from_reader(reader)?)
    }

    /// Wrap an in-memory OPC package after checking its main part.
    pub fn from_opc(opc: OpcPackage) -> Result<Self> {
        let main = opc
            .main_document()
            .map_err(|e| OoxmlError::PartNotFound(format!("main presentation part: {e}")))?;

        // Support regular, macro-enabled, template and show variants
        let content_type = opc.content_type_of(&main)?;
        if !PRESENTATION_TYPES.contains(&content_type) {
            return Err(OoxmlError::InvalidContentType {
                expected: format!("{} or {}", ct::PML_PRESENTATION_MAIN, ct::PML_PRES_MACRO_MAIN),
                got: content_type.to_string(),
            });
        }
        if !opc.contains(&main) {
            return Err(OoxmlError::PartNotFound(main.to_string()));
        }

        Ok(Self { opc, main })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.opc.to_bytes()?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Ok(self.opc.save(path)?)
    }

    /// Get the underlying OPC package.
    #[inline]
    pub fn opc(&self) -> &OpcPackage {
        &self.opc
    }

    #[inline]
    pub fn opc_mut(&mut self) -> &mut OpcPackage {
        &mut self.opc
    }

    pub fn into_opc(self) -> OpcPackage {
        self.opc
    }

    #[inline]
    pub fn presentation_partname(&self) -> &PackURI {
        &self.main
    }

    /// Parse the presentation part together with its relationships.
    pub fn presentation(&self) -> Result<Presentation> {
        Presentation::load(&self.opc, &self.main)
    }

    /// Write a presentation model back into the package.
    pub fn store_presentation(&mut self, pres: &Presentation) {
        pres.store(&mut self.opc);
    }

    /// Slide part names in presentation order.
    pub fn slide_partnames(&self) -> Result<Vec<PackURI>> {
        Ok(self
            .presentation()?
            .slide_entries()
            .into_iter()
            .map(|entry| entry.partname)
            .collect())
    }

    /// Slide part at a 0-based presentation position.
    pub fn slide_partname(&self, position: usize) -> Result<Option<PackURI>> {
        Ok(self.slide_partnames()?.into_iter().nth(position))
    }
}
