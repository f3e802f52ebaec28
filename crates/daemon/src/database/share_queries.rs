use sqlx::Row;
use time::OffsetDateTime;

use common::prelude::ShareLink;

use crate::database::Database;

impl Database {
    /// Persist a freshly minted link.
    pub async fn save_share_link(&self, link: &ShareLink) -> Result<(), sqlx::Error> {
        let owner = i64::try_from(link.user_id)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            r#"
            INSERT INTO share_links (hash, path, expire, user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&link.hash)
        .bind(&link.path)
        .bind(link.expire.unix_timestamp())
        .bind(owner)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&**self)
        .await?;
        Ok(())
    }

    /// Look up a link by its token, expired or not.
    pub async fn get_share_link(&self, hash: &str) -> Result<Option<ShareLink>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT hash, path, expire, user_id
            FROM share_links
            WHERE hash = ?1
            "#,
        )
        .bind(hash)
        .fetch_optional(&**self)
        .await?;

        row.map(|row| {
            let expire: i64 = row.get("expire");
            let user_id: i64 = row.get("user_id");
            Ok(ShareLink {
                hash: row.get("hash"),
                path: row.get("path"),
                expire: OffsetDateTime::from_unix_timestamp(expire)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
                user_id: u64::try_from(user_id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            })
        })
        .transpose()
    }

    pub async fn delete_share_link(&self, hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM share_links WHERE hash = ?1")
            .bind(hash)
            .execute(&**self)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop every link that expired before `now`. Returns how many went.
    pub async fn delete_expired_share_links(
        &self,
        now: OffsetDateTime,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM share_links WHERE expire <= ?1")
            .bind(now.unix_timestamp())
            .execute(&**self)
            .await?;

        Ok(result.rows_affected())
    }
}
