use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repository::{AreaTopic, QuizRepository, StoreError};
use crate::metrics::track_db_operation;
use crate::models::taxonomy::BlockTopicRow;
use crate::models::{
    AnswerEvent, AnswerOrigin, FailureStreak, Question, QuestionFilters, StreakHit, TestResult,
};
use crate::utils::time::{bson_to_chrono, chrono_to_bson};

const QUESTIONS: &str = "preguntas";
const BLOCKS: &str = "bloques_guardia_civil";
const ANSWERS: &str = "respuestas_usuario";
const RESULTS: &str = "resultados_tests";
const STREAKS: &str = "mentoria";

#[derive(Debug, Deserialize)]
struct QuestionDocument {
    #[serde(rename = "_id")]
    id: Bson,
    area: String,
    tema: String,
    bloque: Option<String>,
    #[serde(default)]
    titulo: String,
    pregunta: String,
    opciones: BTreeMap<String, String>,
    respuesta_correcta: String,
    #[serde(default)]
    justificacion: String,
}

#[derive(Debug, Deserialize)]
struct AreaTopicDocument {
    area: String,
    tema: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BlockDocument {
    bloque_numero: u32,
    bloque_nombre: String,
    tema_numero: u32,
    tema_codigo: String,
    tema_nombre: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnswerDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: Option<String>,
    pregunta_id: String,
    area: String,
    tema: String,
    subtema: Option<String>,
    acertada: bool,
    origen: String,
    fecha_respuesta: BsonDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResultDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: Option<String>,
    area: String,
    tema: String,
    bloque: Option<String>,
    total_preguntas: u32,
    respuestas_correctas: u32,
    respuestas_incorrectas: u32,
    porcentaje_acierto: u32,
    acierto: bool,
    fecha_test: BsonDateTime,
}

#[derive(Debug, Deserialize)]
struct StreakDocument {
    #[serde(rename = "_id")]
    id: String,
    pregunta_id: String,
    #[serde(default)]
    pregunta_texto: String,
    #[serde(default)]
    justificacion: String,
    fallos: u32,
    ya_enviado: bool,
    user_id: Option<String>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

fn id_to_string(id: &Bson) -> Option<String> {
    match id {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(value) => Some(value.clone()),
        _ => None,
    }
}

impl QuestionDocument {
    fn into_question(self) -> Option<Question> {
        Some(Question {
            id: id_to_string(&self.id)?,
            area: self.area,
            topic: self.tema,
            block: self.bloque,
            title: self.titulo,
            prompt: self.pregunta,
            options: self.opciones,
            correct_option: self.respuesta_correcta,
            justification: self.justificacion,
        })
    }
}

impl From<&BlockTopicRow> for BlockDocument {
    fn from(row: &BlockTopicRow) -> Self {
        Self {
            bloque_numero: row.block_number,
            bloque_nombre: row.block_name.clone(),
            tema_numero: row.topic_number,
            tema_codigo: row.topic_code.clone(),
            tema_nombre: row.topic_name.clone(),
        }
    }
}

impl From<BlockDocument> for BlockTopicRow {
    fn from(doc: BlockDocument) -> Self {
        Self {
            block_number: doc.bloque_numero,
            block_name: doc.bloque_nombre,
            topic_number: doc.tema_numero,
            topic_code: doc.tema_codigo,
            topic_name: doc.tema_nombre,
        }
    }
}

impl From<&AnswerEvent> for AnswerDocument {
    fn from(event: &AnswerEvent) -> Self {
        Self {
            id: event.id.clone(),
            user_id: event.user_id.clone(),
            pregunta_id: event.question_id.clone(),
            area: event.area.clone(),
            tema: event.topic.clone(),
            subtema: event.sub_block.clone(),
            acertada: event.correct,
            origen: event.origin.as_str().to_string(),
            fecha_respuesta: chrono_to_bson(event.answered_at),
        }
    }
}

impl From<AnswerDocument> for AnswerEvent {
    fn from(doc: AnswerDocument) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            question_id: doc.pregunta_id,
            area: doc.area,
            topic: doc.tema,
            sub_block: doc.subtema,
            correct: doc.acertada,
            origin: AnswerOrigin::parse(&doc.origen),
            answered_at: bson_to_chrono(doc.fecha_respuesta),
        }
    }
}

impl From<&TestResult> for ResultDocument {
    fn from(result: &TestResult) -> Self {
        Self {
            id: result.id.clone(),
            user_id: result.user_id.clone(),
            area: result.area.clone(),
            tema: result.topic.clone(),
            bloque: result.block.clone(),
            total_preguntas: result.total_questions,
            respuestas_correctas: result.correct_count,
            respuestas_incorrectas: result.incorrect_count,
            porcentaje_acierto: result.percentage,
            acierto: result.passed,
            fecha_test: chrono_to_bson(result.taken_at),
        }
    }
}

impl From<ResultDocument> for TestResult {
    fn from(doc: ResultDocument) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            area: doc.area,
            topic: doc.tema,
            block: doc.bloque,
            total_questions: doc.total_preguntas,
            correct_count: doc.respuestas_correctas,
            incorrect_count: doc.respuestas_incorrectas,
            percentage: doc.porcentaje_acierto,
            passed: doc.acierto,
            taken_at: bson_to_chrono(doc.fecha_test),
        }
    }
}

impl From<StreakDocument> for FailureStreak {
    fn from(doc: StreakDocument) -> Self {
        Self {
            id: doc.id,
            question_id: doc.pregunta_id,
            question_text: doc.pregunta_texto,
            justification: doc.justificacion,
            failures: doc.fallos,
            notified: doc.ya_enviado,
            user_id: doc.user_id,
            created_at: bson_to_chrono(doc.created_at),
            updated_at: bson_to_chrono(doc.updated_at),
        }
    }
}

fn user_filter(user_id: Option<&str>) -> Document {
    match user_id {
        Some(user) => doc! { "user_id": user },
        None => Document::new(),
    }
}

fn question_filter(filters: &QuestionFilters) -> Document {
    let mut filter = Document::new();
    if let Some(area) = &filters.area {
        filter.insert("area", area.as_str());
    }
    if let Some(topic) = &filters.topic {
        filter.insert("tema", topic.as_str());
    }
    if let Some(block) = &filters.block {
        filter.insert("bloque", block.as_str());
    }
    filter
}

pub struct MongoQuizRepository {
    db: Database,
}

impl MongoQuizRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Unique (pregunta_id, user_id) index so concurrent streak upserts cannot duplicate rows.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "pregunta_id": 1, "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.db
            .collection::<Document>(STREAKS)
            .create_index(index)
            .await?;

        let answers_index = IndexModel::builder()
            .keys(doc! { "acertada": 1, "fecha_respuesta": -1 })
            .build();
        self.db
            .collection::<Document>(ANSWERS)
            .create_index(answers_index)
            .await?;

        Ok(())
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection::<T>(name)
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn fetch_questions(&self, filters: &QuestionFilters) -> Result<Vec<Question>, StoreError> {
        let collection = self.collection::<QuestionDocument>(QUESTIONS);
        let filter = question_filter(filters);

        track_db_operation("find", QUESTIONS, async {
            let mut cursor = collection.find(filter).await.map_err(StoreError::query)?;
            let mut questions = Vec::new();
            while let Some(doc) = cursor.try_next().await.map_err(StoreError::query)? {
                match doc.into_question() {
                    Some(question) => questions.push(question),
                    None => tracing::warn!("Skipping question with unsupported _id type"),
                }
            }
            Ok::<_, StoreError>(questions)
        })
        .await
    }

    async fn fetch_area_topic_pairs(&self) -> Result<Vec<AreaTopic>, StoreError> {
        let collection = self.collection::<AreaTopicDocument>(QUESTIONS);

        track_db_operation("find", QUESTIONS, async {
            let mut cursor = collection
                .find(doc! {})
                .projection(doc! { "area": 1, "tema": 1, "_id": 0 })
                .await
                .map_err(StoreError::query)?;
            let mut pairs = Vec::new();
            while let Some(doc) = cursor.try_next().await.map_err(StoreError::query)? {
                pairs.push((doc.area, doc.tema));
            }
            Ok::<_, StoreError>(pairs)
        })
        .await
    }

    async fn fetch_block_rows(&self) -> Result<Vec<BlockTopicRow>, StoreError> {
        let collection = self.collection::<BlockDocument>(BLOCKS);

        track_db_operation("find", BLOCKS, async {
            let cursor = collection.find(doc! {}).await.map_err(StoreError::query)?;
            let docs: Vec<BlockDocument> = cursor.try_collect().await.map_err(StoreError::query)?;
            Ok::<_, StoreError>(docs.into_iter().map(BlockTopicRow::from).collect())
        })
        .await
    }

    async fn seed_block_rows(&self, rows: &[BlockTopicRow]) -> Result<bool, StoreError> {
        let collection = self.collection::<BlockDocument>(BLOCKS);

        let existing = track_db_operation("count", BLOCKS, async {
            collection
                .estimated_document_count()
                .await
                .map_err(StoreError::query)
        })
        .await?;
        if existing > 0 {
            return Ok(false);
        }

        let docs: Vec<BlockDocument> = rows.iter().map(BlockDocument::from).collect();
        track_db_operation("insert_many", BLOCKS, async {
            collection
                .insert_many(docs)
                .await
                .map_err(StoreError::write)
        })
        .await?;
        Ok(true)
    }

    async fn insert_answer_event(&self, event: &AnswerEvent) -> Result<(), StoreError> {
        let collection = self.collection::<AnswerDocument>(ANSWERS);
        let doc = AnswerDocument::from(event);

        track_db_operation("insert", ANSWERS, async {
            collection.insert_one(doc).await.map_err(StoreError::write)?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn insert_test_result(&self, result: &TestResult) -> Result<(), StoreError> {
        let collection = self.collection::<ResultDocument>(RESULTS);
        let doc = ResultDocument::from(result);

        track_db_operation("insert", RESULTS, async {
            collection.insert_one(doc).await.map_err(StoreError::write)?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn list_test_results(&self, user_id: Option<&str>) -> Result<Vec<TestResult>, StoreError> {
        let collection = self.collection::<ResultDocument>(RESULTS);
        let filter = user_filter(user_id);

        track_db_operation("find", RESULTS, async {
            let cursor = collection
                .find(filter)
                .sort(doc! { "fecha_test": -1 })
                .await
                .map_err(StoreError::query)?;
            let docs: Vec<ResultDocument> = cursor.try_collect().await.map_err(StoreError::query)?;
            Ok::<_, StoreError>(docs.into_iter().map(TestResult::from).collect())
        })
        .await
    }

    async fn list_incorrect_answers_since(
        &self,
        user_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<AnswerEvent>, StoreError> {
        let collection = self.collection::<AnswerDocument>(ANSWERS);
        let mut filter = user_filter(user_id);
        filter.insert("acertada", false);
        filter.insert("fecha_respuesta", doc! { "$gte": chrono_to_bson(since) });

        track_db_operation("find", ANSWERS, async {
            let cursor = collection
                .find(filter)
                .sort(doc! { "fecha_respuesta": -1 })
                .await
                .map_err(StoreError::query)?;
            let docs: Vec<AnswerDocument> = cursor.try_collect().await.map_err(StoreError::query)?;
            Ok::<_, StoreError>(docs.into_iter().map(AnswerEvent::from).collect())
        })
        .await
    }

    async fn count_answers_by_area_topic(
        &self,
        user_id: Option<&str>,
    ) -> Result<HashMap<AreaTopic, u32>, StoreError> {
        let collection = self.collection::<Document>(ANSWERS);
        let pipeline = vec![
            doc! { "$match": user_filter(user_id) },
            doc! { "$group": {
                "_id": { "area": "$area", "tema": "$tema" },
                "total": { "$sum": 1 },
            } },
        ];

        track_db_operation("aggregate", ANSWERS, async {
            let mut cursor = collection
                .aggregate(pipeline)
                .await
                .map_err(StoreError::query)?;
            let mut counts = HashMap::new();
            while let Some(doc) = cursor.try_next().await.map_err(StoreError::query)? {
                let key = doc.get_document("_id").map_err(StoreError::query)?;
                let area = key.get_str("area").unwrap_or_default().to_string();
                let topic = key.get_str("tema").unwrap_or_default().to_string();
                let total = match doc.get("total") {
                    Some(Bson::Int32(v)) => *v as u32,
                    Some(Bson::Int64(v)) => *v as u32,
                    _ => 0,
                };
                counts.insert((area, topic), total);
            }
            Ok::<_, StoreError>(counts)
        })
        .await
    }

    async fn increment_failure_streak(
        &self,
        hit: &StreakHit,
        now: DateTime<Utc>,
    ) -> Result<FailureStreak, StoreError> {
        let collection = self.collection::<StreakDocument>(STREAKS);
        let user = hit.user_id.clone().map(Bson::String).unwrap_or(Bson::Null);
        let now = chrono_to_bson(now);

        let filter = doc! { "pregunta_id": hit.question_id.as_str(), "user_id": user };
        let update = doc! {
            "$inc": { "fallos": 1 },
            "$set": {
                "pregunta_texto": hit.question_text.as_str(),
                "justificacion": hit.justification.as_str(),
                "updated_at": now,
            },
            "$setOnInsert": {
                "_id": Uuid::new_v4().to_string(),
                "ya_enviado": false,
                "created_at": now,
            },
        };

        track_db_operation("upsert", STREAKS, async {
            collection
                .find_one_and_update(filter, update)
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await
                .map_err(StoreError::write)?
                .map(FailureStreak::from)
                .ok_or_else(|| StoreError::Write("upsert returned no document".to_string()))
        })
        .await
    }

    async fn mark_streak_notified(
        &self,
        streak_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let collection = self.collection::<Document>(STREAKS);

        track_db_operation("update", STREAKS, async {
            let result = collection
                .update_one(
                    doc! { "_id": streak_id, "ya_enviado": false },
                    doc! { "$set": { "ya_enviado": true, "updated_at": chrono_to_bson(now) } },
                )
                .await
                .map_err(StoreError::write)?;
            Ok::<_, StoreError>(result.modified_count == 1)
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            self.db.run_command(doc! { "ping": 1 }),
        )
        .await
        .map_err(|_| StoreError::Unavailable("MongoDB timeout after 1s".to_string()))?
        .map_err(|e| StoreError::Unavailable(format!("MongoDB error: {}", e)))?;
        Ok(())
    }
}
