//! 数据库查询操作

use crate::connection::DatabasePool;
use crate::models::*;
use modula_core::{
    AnamnesisRecord, ModulaError, Patient, Result, SectionName, TransferRequest, User,
};
use sqlx::Row;
use uuid::Uuid;

/// 数据库查询操作接口
pub struct DatabaseQueries<'a> {
    pool: &'a DatabasePool,
}

impl<'a> DatabaseQueries<'a> {
    pub fn new(pool: &'a DatabasePool) -> Self {
        Self { pool }
    }

    /// 创建数据库表
    pub async fn create_tables(&self) -> Result<()> {
        let pool = self.pool.pool();

        // 创建用户表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255) UNIQUE NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'PROFESSIONAL',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| ModulaError::Database(e.to_string()))?;

        // 创建患者表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS patients (
                id UUID PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                birth_date DATE,
                professional_id UUID REFERENCES users(id),
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#).execute(pool).await.map_err(|e| ModulaError::Database(e.to_string()))?;

        // 创建病历表（UNIQUE保证每个患者只有一条记录）
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS anamneses (
                id UUID PRIMARY KEY,
                patient_id UUID UNIQUE NOT NULL REFERENCES patients(id),
                professional_id UUID NOT NULL REFERENCES users(id),
                identification JSONB,
                family_history JSONB,
                current_complaint JSONB,
                treatment_goals JSONB,
                medical_history JSONB,
                psychological_history JSONB,
                lifestyle JSONB,
                relationships JSONB,
                status VARCHAR(20) NOT NULL DEFAULT 'DRAFT',
                completion_percentage INTEGER NOT NULL DEFAULT 0,
                last_modified_section VARCHAR(40),
                professional_notes TEXT,
                treatment_plan TEXT,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                last_auto_save TIMESTAMP WITH TIME ZONE,
                completed_at TIMESTAMP WITH TIME ZONE
            )
        "#).execute(pool).await.map_err(|e| ModulaError::Database(e.to_string()))?;

        // 创建转诊表
        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS transfer_requests (
                id UUID PRIMARY KEY,
                patient_id UUID NOT NULL REFERENCES patients(id),
                from_professional_id UUID NOT NULL REFERENCES users(id),
                to_professional_id UUID NOT NULL REFERENCES users(id),
                reason TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
                admin_notes TEXT,
                requested_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                processed_at TIMESTAMP WITH TIME ZONE
            )
        "#).execute(pool).await.map_err(|e| ModulaError::Database(e.to_string()))?;

        // 创建索引以优化查询性能
        self.create_indexes().await?;

        tracing::info!("Database tables created successfully");
        Ok(())
    }

    /// 创建数据库索引
    async fn create_indexes(&self) -> Result<()> {
        let pool = self.pool.pool();

        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
            "CREATE INDEX IF NOT EXISTS idx_patients_professional_id ON patients(professional_id)",
            "CREATE INDEX IF NOT EXISTS idx_anamneses_patient_id ON anamneses(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_anamneses_professional_id ON anamneses(professional_id)",
            "CREATE INDEX IF NOT EXISTS idx_anamneses_status ON anamneses(status)",
            "CREATE INDEX IF NOT EXISTS idx_transfers_patient_id ON transfer_requests(patient_id)",
            "CREATE INDEX IF NOT EXISTS idx_transfers_status ON transfer_requests(status)",
            "CREATE INDEX IF NOT EXISTS idx_transfers_requested_at ON transfer_requests(requested_at)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(pool)
                .await
                .map_err(|e| ModulaError::Database(e.to_string()))?;
        }

        tracing::info!("Database indexes created successfully");
        Ok(())
    }

    // ========== 用户/患者查询 ==========

    /// 根据ID查找用户
    pub async fn get_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(result.map(User::from))
    }

    /// 根据ID查找患者
    pub async fn get_patient_by_id(&self, id: &Uuid) -> Result<Option<Patient>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbPatient>("SELECT * FROM patients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(result.map(Patient::from))
    }

    /// 转诊完成后把患者划归新的专业人员
    pub async fn reassign_patient(
        &self,
        patient_id: &Uuid,
        professional_id: &Uuid,
    ) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query("UPDATE patients SET professional_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(professional_id)
            .bind(patient_id)
            .execute(pool)
            .await
            .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(())
    }

    // ========== 病历相关操作 ==========

    /// 创建新病历，patient_id冲突时返回Conflict
    pub async fn create_anamnesis(&self, record: &AnamnesisRecord) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO anamneses (
                id, patient_id, professional_id,
                identification, family_history, current_complaint, treatment_goals,
                medical_history, psychological_history, lifestyle, relationships,
                status, completion_percentage, last_modified_section,
                professional_notes, treatment_plan,
                created_at, updated_at, last_auto_save, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING id
        "#)
        .bind(record.id)
        .bind(record.patient_id)
        .bind(record.professional_id)
        .bind(&record.sections.identification)
        .bind(&record.sections.family_history)
        .bind(&record.sections.current_complaint)
        .bind(&record.sections.treatment_goals)
        .bind(&record.sections.medical_history)
        .bind(&record.sections.psychological_history)
        .bind(&record.sections.lifestyle)
        .bind(&record.sections.relationships)
        .bind(record.status.as_str())
        .bind(record.completion_percentage)
        .bind(record.last_modified_section.map(|s| s.as_str()))
        .bind(&record.professional_notes)
        .bind(&record.treatment_plan)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.last_auto_save)
        .bind(record.completed_at)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ModulaError::Conflict("o paciente já possui uma anamnese".to_string())
            }
            _ => ModulaError::Database(e.to_string()),
        })
    }

    /// 根据ID查找病历
    pub async fn get_anamnesis_by_id(&self, id: &Uuid) -> Result<Option<AnamnesisRecord>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbAnamnesis>("SELECT * FROM anamneses WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(result.map(AnamnesisRecord::from))
    }

    /// 根据患者ID查找病历
    pub async fn get_anamnesis_by_patient_id(
        &self,
        patient_id: &Uuid,
    ) -> Result<Option<AnamnesisRecord>> {
        let pool = self.pool.pool();

        let result =
            sqlx::query_as::<_, DbAnamnesis>("SELECT * FROM anamneses WHERE patient_id = $1")
                .bind(patient_id)
                .fetch_optional(pool)
                .await
                .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(result.map(AnamnesisRecord::from))
    }

    /// 持久化一次部分写入（显式更新或被接受的自动保存）
    ///
    /// 列名来自封闭的SectionName枚举，不来自用户输入。
    pub async fn save_section(
        &self,
        record: &AnamnesisRecord,
        section: SectionName,
    ) -> Result<()> {
        let pool = self.pool.pool();

        let sql = format!(
            r#"
            UPDATE anamneses
            SET {} = $1,
                status = $2,
                completion_percentage = $3,
                last_modified_section = $4,
                updated_at = $5,
                last_auto_save = $6
            WHERE id = $7
            "#,
            section.as_str()
        );

        sqlx::query(&sql)
            .bind(record.sections.get(section))
            .bind(record.status.as_str())
            .bind(record.completion_percentage)
            .bind(record.last_modified_section.map(|s| s.as_str()))
            .bind(record.updated_at)
            .bind(record.last_auto_save)
            .bind(record.id)
            .execute(pool)
            .await
            .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(())
    }

    /// 无变更的自动保存：只刷新自动保存时间戳
    pub async fn touch_auto_save(
        &self,
        id: &Uuid,
        last_auto_save: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query("UPDATE anamneses SET last_auto_save = $1 WHERE id = $2")
            .bind(last_auto_save)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(())
    }

    /// 持久化完成动作的终态字段
    pub async fn save_completion(&self, record: &AnamnesisRecord) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            UPDATE anamneses
            SET status = $1,
                completion_percentage = $2,
                professional_notes = $3,
                treatment_plan = $4,
                completed_at = $5,
                updated_at = $6
            WHERE id = $7
        "#)
        .bind(record.status.as_str())
        .bind(record.completion_percentage)
        .bind(&record.professional_notes)
        .bind(&record.treatment_plan)
        .bind(record.completed_at)
        .bind(record.updated_at)
        .bind(record.id)
        .execute(pool)
        .await
        .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(())
    }

    /// 某专业人员的全部未完成病历（待办队列的数据源）
    pub async fn list_incomplete_by_professional(
        &self,
        professional_id: &Uuid,
    ) -> Result<Vec<AnamnesisRecord>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbAnamnesis>(
            "SELECT * FROM anamneses WHERE professional_id = $1 AND status <> 'COMPLETED' ORDER BY created_at",
        )
        .bind(professional_id)
        .fetch_all(pool)
        .await
        .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(results.into_iter().map(AnamnesisRecord::from).collect())
    }

    // ========== 转诊相关操作 ==========

    /// 创建新转诊请求
    pub async fn create_transfer(&self, transfer: &TransferRequest) -> Result<Uuid> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            INSERT INTO transfer_requests (
                id, patient_id, from_professional_id, to_professional_id,
                reason, status, admin_notes, requested_at, processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
        "#)
        .bind(transfer.id)
        .bind(transfer.patient_id)
        .bind(transfer.from_professional_id)
        .bind(transfer.to_professional_id)
        .bind(&transfer.reason)
        .bind(transfer.status.as_str())
        .bind(&transfer.admin_notes)
        .bind(transfer.requested_at)
        .bind(transfer.processed_at)
        .fetch_one(pool)
        .await
        .map(|row| row.get("id"))
        .map_err(|e| ModulaError::Database(e.to_string()))
    }

    /// 根据ID查找转诊
    pub async fn get_transfer_by_id(&self, id: &Uuid) -> Result<Option<TransferRequest>> {
        let pool = self.pool.pool();

        let result =
            sqlx::query_as::<_, DbTransfer>("SELECT * FROM transfer_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await
                .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(result.map(TransferRequest::from))
    }

    /// 批量获取转诊
    pub async fn get_transfers_by_ids(&self, ids: &[Uuid]) -> Result<Vec<TransferRequest>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbTransfer>(
            "SELECT * FROM transfer_requests WHERE id = ANY($1) ORDER BY requested_at",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(results.into_iter().map(TransferRequest::from).collect())
    }

    /// 患者当前的待处理转诊（每个患者最多一个）
    pub async fn get_pending_transfer_by_patient(
        &self,
        patient_id: &Uuid,
    ) -> Result<Option<TransferRequest>> {
        let pool = self.pool.pool();

        let result = sqlx::query_as::<_, DbTransfer>(
            "SELECT * FROM transfer_requests WHERE patient_id = $1 AND status = 'PENDING' LIMIT 1",
        )
        .bind(patient_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(result.map(TransferRequest::from))
    }

    /// 全部待处理转诊（紧急度面板的数据源）
    pub async fn list_pending_transfers(&self) -> Result<Vec<TransferRequest>> {
        let pool = self.pool.pool();

        let results = sqlx::query_as::<_, DbTransfer>(
            "SELECT * FROM transfer_requests WHERE status = 'PENDING' ORDER BY requested_at",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(results.into_iter().map(TransferRequest::from).collect())
    }

    /// 持久化转诊的处理结果
    pub async fn save_transfer(&self, transfer: &TransferRequest) -> Result<()> {
        let pool = self.pool.pool();

        sqlx::query(r#"
            UPDATE transfer_requests
            SET status = $1, admin_notes = $2, processed_at = $3
            WHERE id = $4
        "#)
        .bind(transfer.status.as_str())
        .bind(&transfer.admin_notes)
        .bind(transfer.processed_at)
        .bind(transfer.id)
        .execute(pool)
        .await
        .map_err(|e| ModulaError::Database(e.to_string()))?;

        Ok(())
    }
}
