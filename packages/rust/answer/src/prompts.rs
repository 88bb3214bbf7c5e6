//! Prompt templates for query rewriting and grounded answering.
//!
//! The wording is tuned for trámites of the Ecuadorian government portal and
//! is deliberately kept in Spanish, matching the indexed documents.

/// Returned verbatim when retrieval produces no documents to ground on.
pub const NOT_FOUND_MESSAGE: &str = "Disculpa, no encontré información precisa sobre tu \
consulta en la base de datos. Te recomiendo visitar el portal oficial de gob.ec para más \
detalles.";

/// Rewrites a citizen's question into a formal search query.
pub(crate) const REWRITE_PROMPT: &str = "\
Tu tarea es tomar la siguiente pregunta de un usuario y reescribirla como una consulta de \
búsqueda optimizada y formal, como si fuera el título de un documento oficial del gobierno \
de Ecuador.
Concéntrate en las palabras clave y el objetivo del trámite. No respondas la pregunta, solo \
reescríbela.

Pregunta Original: \"{question}\"
Consulta Optimizada:
";

/// Composes the final answer, constrained to the retrieved documents.
pub(crate) const RESPONSE_PROMPT: &str = "\
Eres un asistente virtual experto en trámites del gobierno de Ecuador. Tu misión es dar \
respuestas claras y directas basadas ÚNICAMENTE en la información de los siguientes documentos.

**Contexto (Documentos Encontrados):**
{context}

**Instrucciones:**
1.  Analiza el contexto para responder a la **Pregunta Original del Ciudadano**.
2.  Si encuentras la respuesta, sintetiza la información clave: requisitos, pasos y costos.
3.  Si la pregunta pide un enlace (link) y está en el contexto, inclúyelo de forma clara.
4.  Si el contexto no contiene la respuesta, di amablemente: \"Disculpa, no encontré \
información precisa sobre tu consulta en la base de datos. Te recomiendo visitar el portal \
oficial de gob.ec para más detalles.\"
5.  Siempre finaliza tu respuesta con la frase: \"Recuerda verificar la información en la \
fuente oficial.\"

**Pregunta Original del Ciudadano:**
{question}

**Tu Respuesta Detallada:**
";

/// Fill `{question}` / `{context}` slots in a template.
pub(crate) fn render(template: &str, question: &str, context: &str) -> String {
    template
        .replace("{question}", question)
        .replace("{context}", context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_both_slots() {
        let out = render(RESPONSE_PROMPT, "¿Cuánto cuesta el pasaporte?", "Costo: 90 USD");
        assert!(out.contains("¿Cuánto cuesta el pasaporte?"));
        assert!(out.contains("Costo: 90 USD"));
        assert!(!out.contains("{question}"));
        assert!(!out.contains("{context}"));
    }

    #[test]
    fn rewrite_prompt_has_no_context_slot() {
        let out = render(REWRITE_PROMPT, "¿cómo saco la cédula?", "");
        assert!(out.contains("¿cómo saco la cédula?"));
        assert!(!out.contains("{question}"));
    }
}
