use std::fmt::Debug;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::descriptor::{ImageDescriptor, PageData};
use crate::fingerprint::Fingerprint;

/// Anything that can appear in a tag index or a feed.
pub trait Listable: Debug + Send + Sync {
    fn date(&self) -> Option<NaiveDate>;

    fn identifier(&self) -> Fingerprint;

    fn title(&self) -> String;

    fn feed_entry(&self) -> FeedEntry;
}

/// The representation of a listable item in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub id: Fingerprint,
    pub title: String,
    pub link: String,
    pub date: Option<NaiveDate>,
    pub author: String,
    pub description: String,
}

/// An image embedded in a gallery, resolved against the gallery's page data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub file: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub date: Option<NaiveDate>,
    pub tags: Vec<Arc<str>>,
    /// Path of the gallery the image belongs to.
    pub gallery: String,
    pub fingerprint: Fingerprint,
}

impl Image {
    pub fn resolve(image: &ImageDescriptor, gallery: &PageData, now: NaiveDate) -> Image {
        let title = match image.title.is_empty() {
            true => crate::util::titleize(file_stem(&image.file)),
            false => image.title.clone(),
        };

        let date = image.date.or(gallery.date);
        Image {
            fingerprint: Fingerprint::new(date, gallery.updated, &title, now),
            file: image.file.clone(),
            description: image.description.clone(),
            author: gallery.author.clone(),
            tags: dedup(image.tags.iter().map(String::as_str)),
            gallery: gallery.path.clone(),
            title,
            date,
        }
    }

    pub fn link(&self) -> String {
        format!("{}#{}", self.gallery, self.fingerprint)
    }
}

impl Listable for Image {
    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn identifier(&self) -> Fingerprint {
        self.fingerprint
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn feed_entry(&self) -> FeedEntry {
        FeedEntry {
            id: self.fingerprint,
            title: self.title.clone(),
            link: self.link(),
            date: self.date,
            author: self.author.clone(),
            description: self.description.clone(),
        }
    }
}

fn file_stem(file: &str) -> &str {
    let name = file.rsplit('/').next().unwrap_or(file);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Trims, drops empty entries and duplicates, keeps first-seen order.
pub(crate) fn dedup<'a, I: IntoIterator<Item = &'a str>>(tags: I) -> Vec<Arc<str>> {
    let mut seen = Vec::<Arc<str>>::new();
    for tag in tags.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
        if !seen.iter().any(|s| &**s == tag) {
            seen.push(tag.into());
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_fill_from_their_gallery() {
        let gallery = PageData {
            author: "Photographer".into(),
            date: NaiveDate::from_ymd_opt(2023, 7, 1),
            path: "/trips/alps".into(),
            ..Default::default()
        };

        let now = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let image = Image::resolve(&ImageDescriptor {
            file: "photos/mont-blanc.jpg".into(),
            tags: vec!["peaks".into(), " peaks ".into(), "".into(), "snow".into()],
            ..Default::default()
        }, &gallery, now);

        assert_eq!(image.title, "Mont blanc");
        assert_eq!(image.date, gallery.date);
        assert_eq!(image.author, "Photographer");
        assert_eq!(image.tags, vec![Arc::<str>::from("peaks"), Arc::<str>::from("snow")]);
        assert_eq!(image.fingerprint, Fingerprint::new(gallery.date, None, "Mont blanc", now));

        let entry = image.feed_entry();
        assert_eq!(entry.link, format!("/trips/alps#{}", image.fingerprint.encode()));
    }
}
