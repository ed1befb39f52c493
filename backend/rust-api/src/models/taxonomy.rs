use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One row of the block table: a topic inside a numbered block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTopicRow {
    pub block_number: u32,
    pub block_name: String,
    pub topic_number: u32,
    pub topic_code: String,
    pub topic_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockTopic {
    pub topic_number: u32,
    pub topic_code: String,
    pub topic_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub block_number: u32,
    pub block_name: String,
    pub topics: Vec<BlockTopic>,
}

impl Block {
    /// Selector label, e.g. `1. Ciencias Jurídicas`.
    pub fn label(&self) -> String {
        format!("{}. {}", self.block_number, self.block_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AreasAndTopics {
    pub areas: Vec<String>,
    pub topics: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Serialize)]
pub struct BlocksResponse {
    pub blocks: Vec<Block>,
}

const GUARDIA_CIVIL_BLOCKS: &[(u32, &str, &[&str])] = &[
    (
        1,
        "Ciencias Jurídicas",
        &[
            "Derechos Humanos",
            "Igualdad Efectiva de Mujeres y Hombres",
            "Prevención de Riesgos Laborales",
            "Derecho Constitucional",
            "Derecho de la Unión Europea",
            "Instituciones Internacionales",
            "Derecho Civil",
            "Derecho Penal",
            "Derecho Procesal Penal",
            "Derecho Administrativo",
            "Protección de Datos",
            "Extranjería e Inmigración",
            "Seguridad Pública y Privada",
            "Ministerio del Interior y Ministerio de Defensa",
            "Fuerzas y Cuerpos de Seguridad. Guardia Civil",
        ],
    ),
    (
        2,
        "Materias Socio-Culturales",
        &[
            "Protección Civil, Desarrollo Sostenible, Eficiencia Energética",
            "Tecnologías de la Información y la Comunicación",
            "Topografía",
            "Deontología Profesional",
            "Responsabilidad Penal de los Menores",
            "Protección Integral contra la Violencia de Género",
        ],
    ),
    (
        3,
        "Materias Técnico-Científicas",
        &["Armas y Explosivos", "Derecho Fiscal"],
    ),
];

/// The fixed Guardia Civil syllabus: 3 blocks, topics T1..T23 numbered across blocks.
pub fn guardia_civil_reference() -> Vec<BlockTopicRow> {
    let mut rows = Vec::new();
    let mut topic_number = 0;
    for (block_number, block_name, topics) in GUARDIA_CIVIL_BLOCKS {
        for topic_name in topics.iter() {
            topic_number += 1;
            rows.push(BlockTopicRow {
                block_number: *block_number,
                block_name: block_name.to_string(),
                topic_number,
                topic_code: format!("T{}", topic_number),
                topic_name: topic_name.to_string(),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_dataset_has_three_blocks_and_23_topics() {
        let rows = guardia_civil_reference();
        assert_eq!(rows.len(), 23);

        let blocks: BTreeSet<u32> = rows.iter().map(|r| r.block_number).collect();
        assert_eq!(blocks.len(), 3);

        assert_eq!(rows[0].topic_code, "T1");
        assert_eq!(rows[15].topic_code, "T16");
        assert_eq!(rows[15].block_number, 2);
        assert_eq!(rows[22].topic_name, "Derecho Fiscal");
    }
}
