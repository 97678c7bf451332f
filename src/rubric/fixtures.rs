//! Sample rubric records for tests and local runs.

use serde_json::{Value, json};

use super::types::RubricIndicator;

/// Raw record for indicator `M1T1-I1`:
/// Básico is OR over three conditions, Competente AND over three, Destacado AND over two.
pub fn indicator_record() -> Value {
    json!({
        "indicador_id": "M1T1-I1",
        "nombre_indicador": "Formulación de objetivos de aprendizaje",
        "descripcion_general": "Evalúa la coherencia de los objetivos con el currículum vigente.",
        "dominio": "A",
        "estandar_numero": 2,
        "año_vigencia": 2025,
        "nivel_educativo": "Educación Básica",
        "asignatura": "Matemática",
        "modalidad": "Regular",
        "modulo": 1,
        "tarea": 1,
        "peso_porcentaje": 25.0,
        "niveles_desempeno": {
            "insatisfactorio": {
                "nivel": "Insatisfactorio",
                "puntaje": 1.0,
                "logica": "OR",
                "descripcion": "No alcanza el nivel básico.",
                "condiciones": []
            },
            "basico": {
                "nivel": "Básico",
                "puntaje": 2.0,
                "logica": "OR",
                "descripcion": "Formula objetivos parcialmente alineados.",
                "condiciones": [
                    {
                        "id": "B1",
                        "descripcion": "Menciona al menos un objetivo de aprendizaje",
                        "tipo": "presencia",
                        "requiere_evidencia": true,
                        "criterios": { "palabras_clave": ["objetivo"] }
                    },
                    {
                        "id": "B2",
                        "descripcion": "Relaciona la actividad con el currículum",
                        "tipo": "presencia",
                        "requiere_evidencia": true
                    },
                    {
                        "id": "B3",
                        "descripcion": "Describe el grupo de estudiantes",
                        "tipo": "presencia",
                        "requiere_evidencia": false
                    }
                ]
            },
            "competente": {
                "nivel": "Competente",
                "puntaje": 3.0,
                "logica": "AND",
                "descripcion": "Objetivos claros, pertinentes y evaluables.",
                "condiciones": [
                    {
                        "id": "C1",
                        "descripcion": "El objetivo declara una habilidad y un contenido",
                        "tipo": "calidad",
                        "requiere_evidencia": true
                    },
                    {
                        "id": "C2",
                        "descripcion": "El objetivo es coherente con las Bases Curriculares",
                        "tipo": "calidad",
                        "requiere_evidencia": true
                    },
                    {
                        "id": "C3",
                        "descripcion": "Incluye al menos dos actividades alineadas",
                        "tipo": "cantidad",
                        "requiere_evidencia": true,
                        "criterios": { "longitud_minima": 40 }
                    }
                ]
            },
            "destacado": {
                "nivel": "Destacado",
                "puntaje": 4.0,
                "logica": "AND",
                "descripcion": "Además considera la diversidad del curso.",
                "condiciones": [
                    {
                        "id": "D1",
                        "descripcion": "Ajusta el objetivo a la diversidad de estudiantes",
                        "tipo": "calidad",
                        "requiere_evidencia": true
                    },
                    {
                        "id": "D2",
                        "descripcion": "Explicita cómo verificará el logro del objetivo",
                        "tipo": "especifica",
                        "requiere_evidencia": true,
                        "criterios": { "patron": "evalua(r|ción)" }
                    }
                ]
            }
        },
        "activo": true,
        "version": "2025.1"
    })
}

pub fn sample_indicator() -> RubricIndicator {
    serde_json::from_value(indicator_record()).expect("fixture rubric is valid")
}
