//! Query expansion with domain synonyms
//!
//! Every dictionary key found as a substring of the lowercased query appends
//! its expansion string. The original query always stays as the first part;
//! repeated terms are harmless since only presence matters downstream.

/// Expansion outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedQuery {
    /// Lowercased original query
    pub original: String,
    /// Original plus appended expansions
    pub expanded: String,
    /// Dictionary keys that matched, in dictionary order
    pub matched_keys: Vec<String>,
}

impl ExpandedQuery {
    pub fn was_expanded(&self) -> bool {
        !self.matched_keys.is_empty()
    }
}

/// Default dictionary as ordered (key, expansion) pairs
const DEFAULT_SYNONYMS: &[(&str, &str)] = &[
    // Create / load
    ("cargar", "cargo crear definir dar alta agregar nueva"),
    ("cargo", "crear definir dar alta agregar nueva"),
    ("crear", "creo cargar definir dar alta agregar nueva"),
    ("creo", "crear cargar definir dar alta agregar nueva"),
    ("definir", "definir cargar crear dar alta agregar nueva"),
    ("defino", "defino definir cargar crear dar alta agregar nueva"),
    ("dar de alta", "dar de alta cargar crear definir agregar nueva"),
    ("doy de alta", "doy de alta cargar crear definir agregar nueva"),
    ("agregar", "agrego cargar crear definir dar alta nueva"),
    ("agrego", "agrego agregar cargar crear definir dar alta nueva"),
    // Nouns
    ("cuenta", "cuenta contable plan cuentas"),
    ("empresa", "empresa compañía organización datos empresa"),
    ("asiento", "asiento contable registro movimiento"),
    // Close
    ("cerrar", "cierro cerrar cierre finalizar ejercicio"),
    ("cierro", "cierro cerrar cierre finalizar ejercicio"),
    ("cierre", "cierro cerrar finalizar"),
    // Issue / generate
    ("emitir", "emito emitir generar listar reporte informe"),
    ("emito", "emito emitir generar listar reporte informe"),
    ("generar", "genero emitir listar informe reporte"),
    ("genero", "genero generar emitir listar informe reporte"),
    // Query / show
    ("consultar", "consulto consultar ver mostrar buscar"),
    ("consulto", "consulto consultar ver mostrar buscar"),
    ("mostrar", "muestra mostrar consultar ver buscar"),
    ("muestro", "muestra mostrar consultar ver buscar"),
    // Delete
    ("eliminar", "elimino eliminar borrar borro"),
    ("elimino", "elimino eliminar borrar borro"),
    ("borro", "elimino eliminar borrar borro"),
    ("borrar", "elimino eliminar borrar borro"),
    // Register / assign / select
    ("registrar", "registrar registro"),
    ("registro", "registro registrar"),
    ("asignar", "asignar asigno"),
    ("asigno", "asigno asignar"),
    ("incorporo", "incorporo incorporar"),
    ("incorporar", "incorporar incorporo"),
    ("seleccionar", "seleccionar selecciono"),
    ("selecciono", "selecciono seleccionar"),
    // Modify
    ("modificar", "modificar modifico cambiar actualiza"),
    ("modifico", "modifico modificar cambiar actualiza"),
    ("actualizar", "actualizar actualiza modificar"),
    ("actualiza", "actualiza actualizar modificar"),
];

/// Synonym expander for retrieval queries
#[derive(Debug, Clone, Copy)]
pub struct QueryExpander {
    synonyms: &'static [(&'static str, &'static str)],
}

impl QueryExpander {
    /// Create an expander loaded with the default dictionary
    pub fn new() -> Self {
        Self::with_entries(DEFAULT_SYNONYMS)
    }

    /// Create an expander over a fixed dictionary
    pub fn with_entries(synonyms: &'static [(&'static str, &'static str)]) -> Self {
        Self { synonyms }
    }

    /// Expand a query, returning the flattened text
    pub fn expand(&self, query: &str) -> String {
        self.expand_detailed(query).expanded
    }

    /// Expand a query, reporting which keys matched
    pub fn expand_detailed(&self, query: &str) -> ExpandedQuery {
        let original = query.to_lowercase();
        let mut parts = vec![original.clone()];
        let mut matched_keys = Vec::new();
        for (key, expansion) in self.synonyms {
            if original.contains(key) {
                parts.push(expansion.to_string());
                matched_keys.push(key.to_string());
            }
        }

        ExpandedQuery {
            expanded: parts.join(" "),
            original,
            matched_keys,
        }
    }

    /// Number of dictionary entries
    pub fn len(&self) -> usize {
        self.synonyms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synonyms.is_empty()
    }
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new()
    }
}
