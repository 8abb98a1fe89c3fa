//! Image downloads: single tiles, thumbnails, barcode and label images.
//!
//! Images are returned as the encoded bytes the server sent. They are not
//! decoded and not cached.

use bytes::Bytes;

use super::request::{ThumbnailSize, TileOptions};
use crate::client::Client;
use crate::error::ClientError;
use crate::session::Session;
use crate::slide::normalize_slide_ref;
use crate::transport::{ApiUrl, Transport};

impl<T: Transport> Client<T> {
    /// One encoded tile.
    ///
    /// Without a zoom level in `options`, the slide's max zoom level is used.
    pub async fn get_tile(
        &self,
        slide_ref: &str,
        x: u64,
        y: u64,
        options: TileOptions,
        session_id: Option<&str>,
    ) -> Result<Bytes, ClientError> {
        options.validate().map_err(ClientError::InvalidParameter)?;
        let session = self.session(session_id).await?;

        let zoom_level = match options.zoom_level {
            Some(level) => level,
            None => self.max_zoom_level(slide_ref, Some(session.id())).await?,
        };
        self.fetch_tile(&session, slide_ref, x, y, zoom_level, &options)
            .await
    }

    pub(crate) async fn fetch_tile(
        &self,
        session: &Session,
        slide_ref: &str,
        x: u64,
        y: u64,
        zoom_level: u32,
        options: &TileOptions,
    ) -> Result<Bytes, ClientError> {
        let key = normalize_slide_ref(slide_ref);
        let url = ApiUrl::new(session.server_url(), "tile")
            .param("sessionID", session.id())
            .param("channels", 0)
            .param("timeframe", 0)
            .param("layer", options.z_stack)
            .param("pathOrUid", key)
            .param("x", x)
            .param("y", y)
            .param("z", zoom_level)
            .param("format", options.format)
            .param("quality", options.quality)
            .param("cache", true);

        self.fetch(session, "tile", key, url).await
    }

    /// Thumbnail of a slide, bounded by `size` (zero bounds are left to the
    /// server).
    pub async fn get_thumbnail(
        &self,
        slide_ref: &str,
        size: ThumbnailSize,
        session_id: Option<&str>,
    ) -> Result<Bytes, ClientError> {
        let session = self.session(session_id).await?;
        let key = normalize_slide_ref(slide_ref);
        let url = ApiUrl::new(session.server_url(), "thumbnail")
            .param("sessionID", session.id())
            .param("pathOrUid", key)
            .param_opt("w", Some(size.width).filter(|w| *w > 0))
            .param_opt("h", Some(size.height).filter(|h| *h > 0));

        self.fetch(&session, "thumbnail", key, url).await
    }

    /// Image of the slide's barcode area.
    pub async fn get_barcode_image(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<Bytes, ClientError> {
        let session = self.session(session_id).await?;
        let key = normalize_slide_ref(slide_ref);
        let url = ApiUrl::new(session.server_url(), "barcode")
            .param("SessionID", session.id())
            .param("pathOrUid", key);

        self.fetch(&session, "barcode", key, url).await
    }

    /// Image of the slide's label area.
    pub async fn get_label_image(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<Bytes, ClientError> {
        let session = self.session(session_id).await?;
        let key = normalize_slide_ref(slide_ref);
        let url = ApiUrl::new(session.server_url(), "label")
            .param("sessionID", session.id())
            .param("pathOrUid", key);

        self.fetch(&session, "label", key, url).await
    }
}
