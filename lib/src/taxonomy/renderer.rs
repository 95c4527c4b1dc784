use std::sync::Arc;

use rayon::prelude::*;

use crate::error::Result;
use crate::taxonomy::*;

/// Renders every node in parallel, collecting into `R::Output`, while gallery
/// images are handed to [`Renderer::render_image()`] alongside.
#[inline(always)]
pub fn render_tree<R>(renderer: &R, tree: &Tree) -> Result<R::Output>
    where R: Renderer + ?Sized
{
    let (collected, images_result): (Result<R::Output>, _) = rayon::join(
        || tree.nodes().par_iter()
            .map(|node| renderer.render_node(tree, node))
            .collect(),
        || tree.nodes().par_iter()
            .filter(|node| node.kind == crate::descriptor::Kind::Gallery)
            .flat_map_iter(|node| node.images())
            .try_for_each(|image| renderer.render_image(tree, &image))
    );

    match (collected, images_result) {
        (Ok(v), Ok(_)) => Ok(v),
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => Err(e),
        (Err(e1), Err(e2)) => Err(e1.chain(e2)),
    }
}

/// A consumer of a resolved tree.
pub trait Renderer: Sync {
    type Output: FromParallelIterator<Self::Render> + Send;

    type Render: Send;

    #[inline(always)]
    fn render_tree(&self, tree: &Tree) -> Result<Self::Output> {
        render_tree(self, tree)
    }

    fn render_node(&self, tree: &Tree, node: &Arc<Node>) -> Result<Self::Render>;

    fn render_image(&self, _tree: &Tree, _image: &Image) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Gallery, ImageDescriptor, PageData, Root};
    use crate::settings::Settings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Paths {
        images: AtomicUsize,
    }

    impl Renderer for Paths {
        type Output = Vec<String>;
        type Render = String;

        fn render_node(&self, _: &Tree, node: &Arc<Node>) -> Result<String> {
            Ok(node.path.to_string())
        }

        fn render_image(&self, _: &Tree, _: &Image) -> Result<()> {
            self.images.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn renders_every_node_in_order() {
        let mut tree = Tree::new(Settings::default(), Root::default(), "/site", Origin::Synthetic);
        let gallery = Gallery {
            page: PageData { title: "Trip".into(), ..Default::default() },
            images: vec![
                ImageDescriptor { file: "a.jpg".into(), ..Default::default() },
                ImageDescriptor { file: "b.jpg".into(), ..Default::default() },
            ],
            ..Default::default()
        };

        tree.insert(tree.root_id(), "trip", gallery.into(), "/site/trip", Origin::Synthetic).unwrap();
        tree.resolve_all().unwrap();

        let renderer = Paths::default();
        assert_eq!(renderer.render_tree(&tree).unwrap(), ["/", "/trip"]);
        assert_eq!(renderer.images.load(Ordering::SeqCst), 2);
    }
}
