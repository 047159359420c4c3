//! Verification Code Model
use crate::db::{schema::verification_codes, Conn};
use chrono::NaiveDateTime;
use diesel::{
    pg::Pg, ExpressionMethods, OptionalExtension, QueryDsl, Queryable, Selectable,
    SelectableHelper,
};
use diesel_async::RunQueryDsl;

/// Verification Code Record, as written by the code issuer
#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = verification_codes)]
#[diesel(check_for_backend(Pg))]
pub struct VerificationCodeRecord {
    /// The verification code
    pub code: String,
    /// Username of the identity the code was issued for
    pub username: String,
    /// Inserted at timestamp
    pub inserted_at: NaiveDateTime,
}

impl VerificationCodeRecord {
    /// Find the record for a code, if any
    pub async fn find(
        conn: &mut Conn<'_>,
        code: &str,
    ) -> Result<Option<Self>, diesel::result::Error> {
        tracing::debug!("Looking up verification code");

        verification_codes::table
            .filter(verification_codes::code.eq(code))
            .select(VerificationCodeRecord::as_select())
            .first(conn)
            .await
            .optional()
    }

    /// *Use* a code, making it impossible for it to be used again.
    ///
    /// Returns whether the code still existed. The delete is a single
    /// statement, so only one of several concurrent callers sees `true`.
    pub async fn consume(conn: &mut Conn<'_>, code: &str) -> Result<bool, diesel::result::Error> {
        tracing::debug!("Consuming verification code");

        let deleted =
            diesel::delete(verification_codes::table.filter(verification_codes::code.eq(code)))
                .execute(conn)
                .await?;

        Ok(deleted == 1)
    }
}
