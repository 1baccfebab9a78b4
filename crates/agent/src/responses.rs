//! Canned replies

use docbot_rag::normalize_generic;

/// Reply when retrieval or the answer gate comes up empty
pub const NO_INFO_RESPONSE: &str = "No encontré información específica para responder esa pregunta. \
     ¿Podrías reformular la consulta o indicar el módulo/pantalla exacta para buscar mejor?";

/// Greeting, farewell and thanks replies, keyed by generic-normalized text
const PREDEFINED: &[(&str, &str)] = &[
    ("hola", "¡Hola! Soy la IA especializada en EasySoft. ¿En qué puedo ayudarte hoy?"),
    ("adios", "¡Hasta pronto! Si necesitas más ayuda, no dudes en preguntar."),
    ("gracias", "De nada. Estoy aquí para ayudarte."),
    ("buenos dias", "¡Buenos días! ¿Cómo puedo asistirte hoy?"),
    ("buenas tardes", "¡Buenas tardes! ¿En qué puedo ayudarte?"),
    ("buenas noches", "¡Buenas noches! ¿Hay algo en lo que pueda ayudarte?"),
    ("chau", "¡Hasta luego!"),
    ("despues seguimos", "¡Seguro! Estoy aquí para ayudarte."),
    ("hasta manana", "Hasta mañana. Estaré aquí para ayudarte."),
];

/// Exact (normalized) match against the predefined replies
pub fn predefined_response(question: &str) -> Option<&'static str> {
    let key = normalize_generic(question);
    PREDEFINED
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, reply)| *reply)
}
