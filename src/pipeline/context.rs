//! Context assembly — evidence plus question into one LLM prompt.
//!
//! The system prompt carries the organization's glossary and the
//! grounding rules; the user prompt renders the evidence as delimited
//! blocks and closes with the literal question. Global prompt size is
//! kept in check by the callers (small top-K, per-excerpt cap), not
//! here.

use crate::models::AggregateRow;

/// Domain glossary and grounding instructions, prepended to every
/// question. The model must answer only from the supplied evidence and
/// say so when the answer is not there.
pub const SYSTEM_PROMPT: &str = "\
Eres un asistente médico especializado en los registros de actividad de un GBT.

IMPORTANTE:
- GBT significa Grupo Básico de Trabajo.
- CMF significa Consultorio Médico de la Familia.
- TTL / GRAL significa total general.
- CONS significa consultorio.
- TERR significa Terreno.
- Existen 11 CMF (consultorios).
- El TOTAL GENERAL de cada mes está en la hoja llamada CONSOLIDADO.
- Los datos por CMF están en hojas individuales con los mismos indicadores.
- El nombre del archivo indica el MES y el AÑO (ej: REGISTRO DIARIO DE GBT I ENERO 2024).
- SOLO debes responder usando la información contenida en la evidencia suministrada.
- NO inventes datos.
- Si la información no está disponible, responde claramente que no existe en los registros.";

/// Evidence handed to the model: either aggregate rows from the fact
/// graph or raw sheet excerpts from the fallback path.
#[derive(Debug, Clone)]
pub enum Evidence {
    Aggregates(Vec<AggregateRow>),
    Excerpts(Vec<DocumentExcerpt>),
}

/// One document excerpt for the fallback path.
#[derive(Debug, Clone)]
pub struct DocumentExcerpt {
    pub name: String,
    /// Flat sheet text, already capped by the extractor.
    pub content: String,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        match self {
            Evidence::Aggregates(rows) => rows.is_empty(),
            Evidence::Excerpts(excerpts) => {
                excerpts.iter().all(|e| e.content.trim().is_empty())
            }
        }
    }
}

/// Build the user prompt: evidence blocks, then the literal question,
/// then the closing instruction.
pub fn assemble(question: &str, evidence: &Evidence) -> String {
    let mut prompt = String::new();

    if evidence.is_empty() {
        prompt.push_str(
            "No hay datos estructurados relevantes en la base de datos para la consulta.\n",
        );
    } else {
        match evidence {
            Evidence::Aggregates(rows) => {
                prompt.push_str("Resumen de datos relevantes (patología | CMF | total):\n");
                for row in rows {
                    prompt.push_str(&format!(
                        "- {} | {} | total: {}\n",
                        row.pathology, row.clinic, row.total
                    ));
                }
            }
            Evidence::Excerpts(excerpts) => {
                for excerpt in excerpts {
                    if excerpt.content.trim().is_empty() {
                        continue;
                    }
                    prompt.push_str(&format!(
                        "<DOCUMENTO nombre=\"{}\">\n{}\n</DOCUMENTO>\n",
                        excerpt.name, excerpt.content
                    ));
                }
            }
        }
    }

    prompt.push_str(&format!("\nPregunta: {question}\n"));
    prompt.push_str("Responde de forma concisa, mostrando cifras y explicación breve.");
    prompt
}
