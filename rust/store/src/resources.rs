// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Installation resources (cranes, installers, welders) used for the team
//! and method pick lists.

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub project_id: String,
    /// Free-form category, e.g. `crane` or `installer`.
    pub kind: String,
    pub name: String,
    pub active: bool,
}

impl RecordStore {
    /// Active resources of a project, grouped by kind.
    pub async fn list_resources(&self, project_id: &str) -> Result<Vec<Resource>> {
        let resources = sqlx::query_as::<_, Resource>(
            r#"
            SELECT id, project_id, kind, name, active
            FROM resources
            WHERE project_id = $1 AND active
            ORDER BY kind, name
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(resources)
    }
}
