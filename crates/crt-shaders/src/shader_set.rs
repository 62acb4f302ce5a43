//! The shader set owns every pipeline the renderer draws with
//!
//! Construction builds text, background and image pipelines in that order.
//! A built-in failure is fatal: the built-ins that already exist are dropped
//! and the error is returned. The postprocess chain comes last and its
//! failure is absorbed, so a broken user shader never stops rendering.

use crate::builtin::{self, BuiltinSources};
use crate::error::ShaderError;
use crate::pipeline::PipelineCompiler;
use crate::postprocess;

struct Builtins<P> {
    text: P,
    background: P,
    image: P,
}

/// Built-in pipelines plus the ordered postprocess chain
pub struct ShaderSet<P> {
    builtins: Option<Builtins<P>>,
    postprocess: Vec<P>,
    full_screen_vertex: String,
    torn_down: bool,
}

impl<P> ShaderSet<P> {
    /// Build every pipeline from the embedded built-in shaders
    pub fn new<C, S>(compiler: &C, postprocess_sources: &[S]) -> Result<Self, ShaderError>
    where
        C: PipelineCompiler<Pipeline = P>,
        S: AsRef<str>,
    {
        let sources = BuiltinSources::embedded()?;
        Self::with_sources(compiler, &sources, postprocess_sources)
    }

    /// Build every pipeline from already expanded built-in sources
    pub fn with_sources<C, S>(
        compiler: &C,
        sources: &BuiltinSources,
        postprocess_sources: &[S],
    ) -> Result<Self, ShaderError>
    where
        C: PipelineCompiler<Pipeline = P>,
        S: AsRef<str>,
    {
        let text = builtin::text_pipeline(compiler, sources)?;
        log::debug!("Built cell text pipeline");

        let background = builtin::background_pipeline(compiler, sources)
            .inspect_err(|_| log::debug!("Cell bg pipeline failed, releasing text"))?;
        log::debug!("Built cell bg pipeline");

        let image = builtin::image_pipeline(compiler, sources)
            .inspect_err(|_| log::debug!("Image pipeline failed, releasing text and cell bg"))?;
        log::debug!("Built image pipeline");

        let postprocess = build_or_empty(compiler, &sources.full_screen_vertex, postprocess_sources);

        log::info!(
            "Shader set ready: 3 built-in pipelines, {} postprocess stages",
            postprocess.len()
        );

        Ok(Self {
            builtins: Some(Builtins {
                text,
                background,
                image,
            }),
            postprocess,
            full_screen_vertex: sources.full_screen_vertex.clone(),
            torn_down: false,
        })
    }

    /// Rebuild the postprocess chain from new sources
    ///
    /// The new chain is built before the old one is released. If it fails
    /// the error is logged and the set is left with no postprocessing.
    pub fn replace_postprocess<C, S>(&mut self, compiler: &C, sources: &[S])
    where
        C: PipelineCompiler<Pipeline = P>,
        S: AsRef<str>,
    {
        if self.torn_down {
            log::warn!("Ignoring postprocess rebuild on a released shader set");
            return;
        }

        let chain = build_or_empty(compiler, &self.full_screen_vertex, sources);
        let old = std::mem::replace(&mut self.postprocess, chain);
        if !old.is_empty() {
            log::debug!("Releasing {} old postprocess pipelines", old.len());
        }
        drop(old);
    }

    /// Release every pipeline; later calls do nothing
    pub fn deinit(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        drop(self.builtins.take());
        if !self.postprocess.is_empty() {
            drop(std::mem::take(&mut self.postprocess));
        }
        log::debug!("Shader set released");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn text(&self) -> Option<&P> {
        self.builtins.as_ref().map(|b| &b.text)
    }

    pub fn background(&self) -> Option<&P> {
        self.builtins.as_ref().map(|b| &b.background)
    }

    pub fn image(&self) -> Option<&P> {
        self.builtins.as_ref().map(|b| &b.image)
    }

    /// Postprocess pipelines in application order
    pub fn postprocess(&self) -> &[P] {
        &self.postprocess
    }
}

impl<P> Drop for ShaderSet<P> {
    fn drop(&mut self) {
        self.deinit();
    }
}

impl<P> std::fmt::Debug for ShaderSet<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderSet")
            .field("builtins", &self.builtins.is_some())
            .field("postprocess", &self.postprocess.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

fn build_or_empty<C, S>(compiler: &C, full_screen_vertex: &str, sources: &[S]) -> Vec<C::Pipeline>
where
    C: PipelineCompiler,
    S: AsRef<str>,
{
    match postprocess::build_postprocess(compiler, full_screen_vertex, sources) {
        Ok(chain) => chain,
        Err(err) => {
            log::warn!("error initializing postprocess shaders: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCompiler, MockPipeline};

    fn build(compiler: &MockCompiler, post: &[&str]) -> Result<ShaderSet<MockPipeline>, ShaderError> {
        ShaderSet::new(compiler, post)
    }

    #[test]
    fn test_builds_in_order() {
        let compiler = MockCompiler::new();
        let set = build(&compiler, &[]).unwrap();
        assert_eq!(compiler.compiled(), vec!["cell text", "cell bg", "image"]);
        assert_eq!(set.text().unwrap().label(), "cell text");
        assert_eq!(set.background().unwrap().label(), "cell bg");
        assert_eq!(set.image().unwrap().label(), "image");
        assert!(!set.is_torn_down());
    }

    #[test]
    fn test_text_failure_releases_nothing() {
        let compiler = MockCompiler::new().fail_on_label("cell text");
        assert!(build(&compiler, &[]).is_err());
        assert_eq!(compiler.attempts(), 1);
        assert!(compiler.released().is_empty());
    }

    #[test]
    fn test_image_failure_releases_both_earlier_builtins() {
        let compiler = MockCompiler::new().fail_on_label("image");
        assert!(build(&compiler, &["post"]).is_err());
        let mut released = compiler.released();
        released.sort();
        assert_eq!(released, vec!["cell bg", "cell text"]);
        assert_eq!(compiler.live_count(), 0);
        assert!(!compiler.compiled().iter().any(|l| l.starts_with("postprocess")));
    }

    #[test]
    fn test_deinit_clears_accessors() {
        let compiler = MockCompiler::new();
        let mut set = build(&compiler, &["a"]).unwrap();
        set.deinit();
        assert!(set.is_torn_down());
        assert!(set.text().is_none());
        assert!(set.background().is_none());
        assert!(set.image().is_none());
        assert!(set.postprocess().is_empty());
        assert_eq!(compiler.live_count(), 0);
    }

    #[test]
    fn test_drop_releases_everything() {
        let compiler = MockCompiler::new();
        let set = build(&compiler, &["a", "b"]).unwrap();
        assert_eq!(compiler.live_count(), 5);
        drop(set);
        assert_eq!(compiler.live_count(), 0);
        assert_eq!(compiler.released().len(), 5);
    }

    #[test]
    fn test_replace_postprocess_after_deinit_is_ignored() {
        let compiler = MockCompiler::new();
        let mut set = build(&compiler, &[]).unwrap();
        set.deinit();
        let before = compiler.attempts();
        set.replace_postprocess(&compiler, &["a"]);
        assert_eq!(compiler.attempts(), before);
        assert!(set.postprocess().is_empty());
    }

    #[test]
    fn test_debug_output() {
        let compiler = MockCompiler::new();
        let set = build(&compiler, &["a"]).unwrap();
        let out = format!("{set:?}");
        assert!(out.contains("postprocess: 1"));
        assert!(out.contains("torn_down: false"));
    }
}
