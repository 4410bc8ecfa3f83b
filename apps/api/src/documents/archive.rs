use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// Uploads a transformed CV to `transformed/{user_id}/{uuid}.txt` and returns the key.
pub async fn archive_transformed(
    s3: &aws_sdk_s3::Client,
    s3_bucket: &str,
    user_id: Uuid,
    text: &str,
) -> Result<String, AppError> {
    let s3_key = transformed_key(user_id, Uuid::new_v4());
    s3.put_object()
        .bucket(s3_bucket)
        .key(&s3_key)
        .body(ByteStream::from(Bytes::copy_from_slice(text.as_bytes())))
        .content_type("text/plain; charset=utf-8")
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {s3_key} failed: {e}")))?;

    info!("Archived transformed CV to s3://{}/{}", s3_bucket, s3_key);
    Ok(s3_key)
}

fn transformed_key(user_id: Uuid, artifact_id: Uuid) -> String {
    format!("transformed/{user_id}/{artifact_id}.txt")
}
