//! # Object Pool
//!
//! The pool owns every object set indexed from a logical file and answers
//! type/name queries over them.  Matching is pluggable: the default matcher
//! compares idents exactly and case-sensitively, callers wanting globs or
//! case folding implement `Matcher` themselves.

use super::eflr::{ObjectSet,BasicObject};
use crate::diag::{self,ErrorHandler};
use crate::DYNERR;

/// Name matching strategy for pool queries.  The core only ever calls this
/// one method.
pub trait Matcher {
    fn matches(&self,pattern: &str,candidate: &str) -> bool;
}

/// Exact, case-sensitive comparison.
pub struct ExactMatcher;

impl Matcher for ExactMatcher {
    fn matches(&self,pattern: &str,candidate: &str) -> bool {
        pattern == candidate
    }
}

/// A queryable pool of metadata objects.
pub struct Pool {
    sets: Vec<ObjectSet>
}

impl Pool {
    pub fn new(sets: Vec<ObjectSet>) -> Self {
        Self { sets }
    }

    /// the set types in index order, duplicates preserved
    pub fn types(&self) -> Vec<String> {
        self.sets.iter().map(|set| set.rtype.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Gather the objects of every set whose type matches, flushing each
    /// matched set's parse diagnostics through the handler.
    pub fn get(&mut self,rtype: &str,matcher: &dyn Matcher,
        handler: &mut dyn ErrorHandler) -> Result<Vec<BasicObject>,DYNERR> {
        let mut objs = Vec::new();
        for set in self.sets.iter_mut() {
            if !matcher.matches(rtype,&set.rtype) {
                continue;
            }
            objs.extend(set.objects().iter().cloned());
            report_set_errors(set,handler)?;
        }
        Ok(objs)
    }

    /// As `get`, further filtered on the object name identifier.
    pub fn get_named(&mut self,rtype: &str,name: &str,matcher: &dyn Matcher,
        handler: &mut dyn ErrorHandler) -> Result<Vec<BasicObject>,DYNERR> {
        let mut objs = Vec::new();
        for set in self.sets.iter_mut() {
            if !matcher.matches(rtype,&set.rtype) {
                continue;
            }
            for obj in set.objects() {
                if matcher.matches(name,&obj.name.id) {
                    objs.push(obj.clone());
                }
            }
            report_set_errors(set,handler)?;
        }
        Ok(objs)
    }
}

fn report_set_errors(set: &ObjectSet,handler: &mut dyn ErrorHandler) -> crate::STDRESULT {
    if set.log.len() > 0 {
        let context = format!("object set of type '{}' named '{}'",set.rtype,set.name);
        diag::flush(&set.log,&context,handler)?;
    }
    Ok(())
}
