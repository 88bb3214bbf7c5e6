//! Record assembly: render one raw record into a canonical document.
//!
//! The section order and header wording below are part of the retrieval
//! contract — the index is built over these exact blobs, so changing either
//! is a breaking change that requires a full re-ingest.

use tramitero_normalize::{normalize, normalize_plain};
use tramitero_shared::{DocMetadata, IDENTITY_KEY, RawRecord, TramiteDoc};

/// Raw-record field holding the trámite name.
const NAME_KEY: &str = "Nombre_Tramite";

/// One semantic section of the document body.
struct Section {
    /// Literal header rendered in front of the value.
    header: &'static str,
    /// Raw-record key the value is read from.
    key: &'static str,
    /// Whether the raw value may carry markup and needs stripping.
    markup: bool,
}

/// The fixed section layout, in rendering order.
///
/// Narrative fields come from HTML-heavy page sections and go through full
/// markup stripping; name, institution, URL, and date arrive as plain strings
/// from the scraper and are only trimmed.
const SECTIONS: [Section; 13] = [
    Section { header: "Nombre del Trámite:", key: NAME_KEY, markup: false },
    Section { header: "Institución Responsable:", key: "Institucion_Responsable", markup: false },
    Section { header: "Descripción:", key: "Descripcion", markup: true },
    Section { header: "¿A quién está dirigido?:", key: "A_Quien_Dirigido", markup: true },
    Section { header: "¿Qué obtendré?:", key: "Que_Obtendre", markup: true },
    Section { header: "Requisitos:", key: "Requisitos", markup: true },
    Section { header: "Pasos a seguir:", key: "Como_Hacer_Tramite", markup: true },
    Section { header: "Costo:", key: "Costo", markup: true },
    Section { header: "Canales de Atención:", key: "Canales_Atencion", markup: true },
    Section { header: "Ubicación y Horarios:", key: "Ubicacion_Horarios", markup: true },
    Section { header: "Base Legal:", key: "Base_Legal", markup: true },
    Section { header: "URL de la Fuente Oficial:", key: IDENTITY_KEY, markup: false },
    Section { header: "Fecha de última actualización:", key: "Fecha_Actualizacion", markup: false },
];

/// Render a raw record into a [`TramiteDoc`].
///
/// Always succeeds: missing fields render as the placeholder, and every
/// section header is emitted regardless, so downstream chunking and
/// embedding see a uniform shape.
pub fn assemble(record: &RawRecord) -> TramiteDoc {
    let mut body = String::new();

    for (i, section) in SECTIONS.iter().enumerate() {
        if i > 0 {
            body.push('\n');
        }

        let value = record.field(section.key);
        let text = if section.markup {
            normalize(value)
        } else {
            normalize_plain(value)
        };

        body.push_str(section.header);
        body.push(' ');
        body.push_str(&text);
    }

    TramiteDoc {
        body,
        metadata: DocMetadata {
            source: normalize_plain(record.field(IDENTITY_KEY)),
            title: normalize_plain(record.field(NAME_KEY)),
        },
    }
}
