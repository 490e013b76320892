//! Cross-file redundancy detector.
//!
//! Three-stage funnel over every unordered function pair: cheap filters
//! (body length, boilerplate names, same-class methods), fingerprint
//! similarity scoring, then an optional external oracle for the
//! uncertain middle band. Pairs at or above the auto-confirm threshold
//! never reach the oracle.

use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Language, Result};
use crate::index::{Symbol, SymbolKind};
use crate::oracle::{Oracle, Snippet, Verdict, VerdictCache};

use super::fingerprint::{similarity, Fingerprinter};

/// Names whose bodies are structural boilerplate: constructors and the
/// comparison/hash/iterator special methods.
const BOILERPLATE_NAMES: [&str; 19] = [
    "__init__", "__new__", "__eq__", "__ne__", "__lt__", "__le__", "__gt__", "__ge__",
    "__hash__", "__repr__", "__str__", "__iter__", "__next__", "__len__", "__enter__",
    "__exit__", "equals", "hashCode", "toString",
];

/// Redundancy analyzer.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Full funnel with the oracle consulted for the uncertain band.
    ///
    /// A cache hit skips the oracle call; failure or a malformed
    /// verdict makes that one pair a non-duplicate, never an error.
    pub async fn analyze_with_oracle(
        &self,
        ctx: &AnalysisContext<'_>,
        oracle: &dyn Oracle,
        cache: Option<&VerdictCache>,
    ) -> Result<Analysis> {
        let scored = self.score_pairs(ctx);
        let concurrency = ctx.config.redundancy.oracle_concurrency.max(1);

        let judged: Vec<(PendingPair, Verdict, bool)> = stream::iter(
            scored.pending.into_iter().map(|pair| async move {
                if let Some(cache) = cache {
                    if let Some(verdict) = cache.get(&pair.left_snippet.body, &pair.right_snippet.body) {
                        return (pair, verdict, false);
                    }
                }
                let verdict = match oracle.judge(&pair.left_snippet, &pair.right_snippet).await {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        tracing::warn!(
                            "oracle failed for {} / {}: {e}",
                            pair.left.qualified_name,
                            pair.right.qualified_name
                        );
                        Verdict::negative("oracle failure")
                    }
                };
                if let Some(cache) = cache {
                    cache.insert(
                        &pair.left_snippet.body,
                        &pair.right_snippet.body,
                        verdict.clone(),
                    );
                }
                (pair, verdict, true)
            }),
        )
        .buffer_unordered(concurrency)
        .collect()
        .await;

        let mut duplicates = scored.confirmed;
        let mut oracle_calls = 0;
        for (pair, verdict, called) in judged {
            if called {
                oracle_calls += 1;
            }
            if verdict.are_duplicates {
                duplicates.push(pair.confirm(verdict));
            }
        }
        sort_pairs(&mut duplicates);
        Ok(Analysis {
            duplicates,
            pairs_scored: scored.pairs_scored,
            oracle_calls,
        })
    }

    /// Stages 1 and 2.
    fn score_pairs(&self, ctx: &AnalysisContext<'_>) -> ScoredPairs {
        let cfg = &ctx.config.redundancy;
        let fingerprinter = Fingerprinter::new();

        let candidates: Vec<Candidate<'_>> = ctx
            .index
            .symbols()
            .iter()
            .filter(|s| s.kind == SymbolKind::Function && !is_boilerplate(s))
            .filter(|s| s.body.lines().count() >= cfg.min_body_lines)
            .filter_map(|symbol| {
                let language = Language::detect(&symbol.file)?;
                let tokens = fingerprinter.tokens(&symbol.body, language);
                // unparseable bodies are excluded, not errors
                (!tokens.is_empty()).then_some(Candidate {
                    symbol,
                    language,
                    tokens,
                })
            })
            .collect();

        let mut scored = ScoredPairs::default();
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let (left, right) = (&candidates[i], &candidates[j]);
                if same_class(left.symbol, right.symbol) {
                    continue;
                }
                let score = similarity(&left.tokens, &right.tokens);
                scored.pairs_scored += 1;
                if score < cfg.low_similarity {
                    continue;
                }
                if score >= cfg.auto_confirm {
                    scored.confirmed.push(DuplicatePair {
                        left: left.location(),
                        right: right.location(),
                        similarity: score,
                        reason: format!("structural similarity {score:.2}"),
                        suggestion: Some(format!(
                            "consolidate `{}` and `{}` into one shared function",
                            left.symbol.qualified_name, right.symbol.qualified_name
                        )),
                    });
                } else {
                    scored.pending.push(PendingPair {
                        left: left.location(),
                        right: right.location(),
                        left_snippet: left.snippet(),
                        right_snippet: right.snippet(),
                        similarity: score,
                    });
                }
            }
        }
        scored
    }
}

/// Methods of the same class never pair; intra-class similarity is the
/// class author's business.
fn same_class(a: &Symbol, b: &Symbol) -> bool {
    a.file == b.file && a.parent_class.is_some() && a.parent_class == b.parent_class
}

fn is_boilerplate(symbol: &Symbol) -> bool {
    BOILERPLATE_NAMES.contains(&symbol.name.as_str())
        || symbol.parent_class.as_deref() == Some(symbol.name.as_str())
}

struct Candidate<'a> {
    symbol: &'a Symbol,
    language: Language,
    tokens: Vec<String>,
}

impl Candidate<'_> {
    fn location(&self) -> Location {
        Location {
            name: self.symbol.name.clone(),
            qualified_name: self.symbol.qualified_name.clone(),
            file: self.symbol.file.clone(),
            line: self.symbol.line,
        }
    }

    fn snippet(&self) -> Snippet {
        Snippet {
            name: self.symbol.name.clone(),
            file: self.symbol.file.clone(),
            language: self.language,
            body: self.symbol.body.clone(),
        }
    }
}

#[derive(Default)]
struct ScoredPairs {
    confirmed: Vec<DuplicatePair>,
    pending: Vec<PendingPair>,
    pairs_scored: usize,
}

struct PendingPair {
    left: Location,
    right: Location,
    left_snippet: Snippet,
    right_snippet: Snippet,
    similarity: f64,
}

impl PendingPair {
    fn confirm(self, verdict: Verdict) -> DuplicatePair {
        DuplicatePair {
            left: self.left,
            right: self.right,
            similarity: self.similarity,
            reason: verdict.reason,
            suggestion: verdict.suggestion,
        }
    }
}

fn sort_pairs(pairs: &mut [DuplicatePair]) {
    pairs.sort_by(|a, b| {
        (&a.left.qualified_name, &a.right.qualified_name)
            .cmp(&(&b.left.qualified_name, &b.right.qualified_name))
    });
}

/// Where one side of a duplicate pair lives.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub name: String,
    pub qualified_name: String,
    pub file: PathBuf,
    pub line: u32,
}

/// One confirmed near-duplicate pair.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePair {
    pub left: Location,
    pub right: Location,
    pub similarity: f64,
    pub reason: String,
    pub suggestion: Option<String>,
}

/// Redundancy analysis results.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub duplicates: Vec<DuplicatePair>,
    pub pairs_scored: usize,
    pub oracle_calls: usize,
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "redundancy"
    }

    fn description(&self) -> &'static str {
        "Find near-duplicate functions across files"
    }

    /// Oracle-free funnel: stage-2 similarity is trusted alone, so the
    /// uncertain middle band is reported on its score.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let scored = self.score_pairs(ctx);
        let mut duplicates = scored.confirmed;
        for pair in scored.pending {
            let score = pair.similarity;
            duplicates.push(pair.confirm(Verdict {
                are_duplicates: true,
                reason: format!("structural similarity {score:.2}, unverified"),
                suggestion: None,
            }));
        }
        sort_pairs(&mut duplicates);
        tracing::info!(
            "redundancy analysis: {} pairs scored, {} duplicates",
            scored.pairs_scored,
            duplicates.len()
        );
        Ok(Analysis {
            duplicates,
            pairs_scored: scored.pairs_scored,
            oracle_calls: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::Config;
    use crate::core::{Error, Language, SourceFile, SourceSet};
    use crate::index::Index;

    fn py(path: &str, code: &str) -> SourceFile {
        SourceFile::from_content(path, Language::Python, code.to_string())
    }

    fn corpus() -> SourceSet {
        SourceSet::new(vec![
            py(
                "geometry.py",
                "def calculate_area(width, height):\n    if width < 0 or height < 0:\n        return 0\n    return width * height\n",
            ),
            py(
                "shapes.py",
                "def get_rect_size(w, h):\n    if w < 0 or h < 0:\n        return 0\n    return w * h\n",
            ),
            py(
                "math_util.py",
                "def distinct_function(a, b):\n    total = a + b\n    print(total)\n    return total\n",
            ),
        ])
    }

    struct ScriptedOracle {
        verdict: Verdict,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(verdict: Verdict) -> Self {
            Self {
                verdict,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn judge(&self, _left: &Snippet, _right: &Snippet) -> Result<Verdict> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.verdict.clone())
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl Oracle for FailingOracle {
        async fn judge(&self, _left: &Snippet, _right: &Snippet) -> Result<Verdict> {
            Err(Error::oracle("offline"))
        }
    }

    #[test]
    fn test_renamed_pair_auto_confirms_without_oracle() {
        let index = Index::build(&corpus());
        let config = Config::default();
        let ctx = AnalysisContext::new(&index, &config);
        let analysis = Analyzer::new().analyze(&ctx).unwrap();

        assert_eq!(analysis.oracle_calls, 0);
        assert_eq!(analysis.duplicates.len(), 1);
        let pair = &analysis.duplicates[0];
        assert_eq!(pair.left.name, "calculate_area");
        assert_eq!(pair.right.name, "get_rect_size");
        assert!(pair.similarity >= config.redundancy.auto_confirm);
    }

    #[test]
    fn test_short_bodies_filtered() {
        let files = SourceSet::new(vec![
            py("a.py", "def one():\n    return 1\n"),
            py("b.py", "def two():\n    return 2\n"),
        ]);
        let index = Index::build(&files);
        let config = Config::default();
        let ctx = AnalysisContext::new(&index, &config);
        let analysis = Analyzer::new().analyze(&ctx).unwrap();
        assert_eq!(analysis.pairs_scored, 0);
        assert!(analysis.duplicates.is_empty());
    }

    #[test]
    fn test_constructors_filtered() {
        let files = SourceSet::new(vec![
            py("a.py", "class A:\n    def __init__(self, x):\n        self.x = x\n        self.y = 0\n"),
            py("b.py", "class B:\n    def __init__(self, x):\n        self.x = x\n        self.y = 0\n"),
        ]);
        let index = Index::build(&files);
        let config = Config::default();
        let ctx = AnalysisContext::new(&index, &config);
        let analysis = Analyzer::new().analyze(&ctx).unwrap();
        assert!(analysis.duplicates.is_empty());
    }

    #[tokio::test]
    async fn test_middle_band_consults_oracle() {
        let index = Index::build(&corpus());
        let mut config = Config::default();
        // force every surviving pair into the uncertain band
        config.redundancy.low_similarity = 0.05;
        config.redundancy.auto_confirm = 1.01;
        let ctx = AnalysisContext::new(&index, &config);

        let oracle = ScriptedOracle::new(Verdict {
            are_duplicates: true,
            reason: "same guard-then-multiply shape".to_string(),
            suggestion: None,
        });
        let analysis = Analyzer::new()
            .analyze_with_oracle(&ctx, &oracle, None)
            .await
            .unwrap();

        assert_eq!(analysis.oracle_calls, oracle.calls.load(Ordering::SeqCst));
        assert!(analysis.oracle_calls >= 1);
        assert!(!analysis.duplicates.is_empty());
        assert_eq!(analysis.duplicates[0].reason, "same guard-then-multiply shape");
    }

    #[tokio::test]
    async fn test_oracle_failure_is_negative() {
        let index = Index::build(&corpus());
        let mut config = Config::default();
        config.redundancy.low_similarity = 0.05;
        config.redundancy.auto_confirm = 1.01;
        let ctx = AnalysisContext::new(&index, &config);

        let analysis = Analyzer::new()
            .analyze_with_oracle(&ctx, &FailingOracle, None)
            .await
            .unwrap();
        assert!(analysis.duplicates.is_empty());
        assert!(analysis.oracle_calls >= 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_oracle() {
        let index = Index::build(&SourceSet::new(vec![
            py(
                "geometry.py",
                "def calculate_area(width, height):\n    if width < 0 or height < 0:\n        return 0\n    return width * height\n",
            ),
            py(
                "shapes.py",
                "def get_rect_size(w, h):\n    if w < 0 or h < 0:\n        return 0\n    return w * h\n",
            ),
        ]));
        let mut config = Config::default();
        config.redundancy.low_similarity = 0.05;
        config.redundancy.auto_confirm = 1.01;
        let ctx = AnalysisContext::new(&index, &config);

        let cache = VerdictCache::new();
        let left = index.symbols().get_symbol("geometry.calculate_area").unwrap();
        let right = index.symbols().get_symbol("shapes.get_rect_size").unwrap();
        cache.insert(&left.body, &right.body, Verdict::negative("already judged"));

        let oracle = ScriptedOracle::new(Verdict {
            are_duplicates: true,
            reason: "dup".to_string(),
            suggestion: None,
        });
        let analysis = Analyzer::new()
            .analyze_with_oracle(&ctx, &oracle, Some(&cache))
            .await
            .unwrap();
        assert_eq!(analysis.oracle_calls, 0);
        assert!(analysis.duplicates.is_empty());
    }
}
