pub mod bucket;
pub mod error;
pub mod multipart;
pub mod notification;
pub mod object;
pub mod store;

pub mod prelude {
    pub use crate::bucket::{Bucket, NotificationConfig, NotificationRule, NotificationTarget, WebsiteConfig};
    pub use crate::error::ObjError;
    pub use crate::multipart::{MultipartUpload, PartInfo};
    pub use crate::notification::{s3_event_envelope, DeliverFn};
    pub use crate::object::{etag_of, parse_range, ObjectMeta};
    pub use crate::store::{ListedPage, ObjectStore};
}
