//! Category token routing.
//!
//! Maps a requested category token to the acquisition instructions for one
//! bucket. Tokens are matched case-insensitively by substring against an
//! ordered rule table; the first matching rule wins, so the table order is
//! load-bearing: `boot-journal` must be tested before `boot`, and
//! `kernel-ring` before `kern`.

use crate::application::app_logs::AppLogEnumerator;
use crate::domain::{
    AcquisitionBucket, CMD_DMESG, CMD_JOURNAL_BOOT, CMD_JOURNAL_SYSTEM, CMD_LAST,
};
use crate::infrastructure::{FileLocator, LogCatalog};

/// What a matched rule contributes to its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Run one or more log-dump commands.
    Commands(&'static [&'static str]),
    /// Ask the file locator for a subsystem's files.
    Locate { subsystem: &'static str },
    /// A single literal file path.
    LiteralFile(&'static str),
    /// Expand per-application logs.
    Applications,
    /// Expand the "other logs" table.
    OtherLogs,
    /// Flatten user-defined custom logs.
    CustomLogs,
}

impl RuleKind {
    /// Short human-readable description for listings.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Commands(_) => "command",
            Self::Locate { .. } => "file discovery",
            Self::LiteralFile(_) => "literal file",
            Self::Applications => "application expansion",
            Self::OtherLogs => "other-log table",
            Self::CustomLogs => "custom files",
        }
    }
}

/// One entry of the routing table.
#[derive(Debug, Clone, Copy)]
pub struct TokenRule {
    /// Substring the requested token must contain.
    pub pattern: &'static str,
    /// Category display name; doubles as the staging folder.
    pub category: &'static str,
    /// Acquisition action.
    pub kind: RuleKind,
}

/// Routing table in priority order. First match wins.
pub const TOKEN_RULES: &[TokenRule] = &[
    TokenRule {
        pattern: "system",
        category: "system",
        kind: RuleKind::Commands(&[CMD_JOURNAL_SYSTEM]),
    },
    TokenRule {
        pattern: "boot-journal",
        category: "boot",
        kind: RuleKind::Commands(&[CMD_JOURNAL_BOOT]),
    },
    TokenRule {
        pattern: "kernel-ring",
        category: "kernel",
        kind: RuleKind::Commands(&[CMD_DMESG]),
    },
    TokenRule {
        pattern: "last",
        category: "boot-shutdown-event",
        kind: RuleKind::Commands(&[CMD_LAST]),
    },
    TokenRule {
        pattern: "dpkg",
        category: "dpkg",
        kind: RuleKind::Locate { subsystem: "dpkg" },
    },
    TokenRule {
        pattern: "kern",
        category: "kernel",
        kind: RuleKind::Locate { subsystem: "kern" },
    },
    TokenRule {
        pattern: "xorg",
        category: "xorg",
        kind: RuleKind::Locate { subsystem: "Xorg" },
    },
    TokenRule {
        pattern: "dnf",
        category: "dnf",
        kind: RuleKind::Locate { subsystem: "dnf" },
    },
    TokenRule {
        pattern: "boot",
        category: "boot",
        kind: RuleKind::Locate { subsystem: "boot" },
    },
    TokenRule {
        pattern: "kwin",
        category: "kwin",
        kind: RuleKind::LiteralFile("/var/log/kwin.log"),
    },
    TokenRule {
        pattern: "app",
        category: "apps",
        kind: RuleKind::Applications,
    },
    TokenRule {
        pattern: "coredump",
        category: "coredump",
        kind: RuleKind::Locate {
            subsystem: "coredump",
        },
    },
    TokenRule {
        pattern: "other",
        category: "others",
        kind: RuleKind::OtherLogs,
    },
    TokenRule {
        pattern: "custom",
        category: "customized",
        kind: RuleKind::CustomLogs,
    },
    TokenRule {
        pattern: "audit",
        category: "audit",
        kind: RuleKind::Locate { subsystem: "audit" },
    },
];

/// Find the first rule whose pattern the token contains.
#[must_use]
pub fn match_rule(token: &str) -> Option<&'static TokenRule> {
    let lowered = token.to_lowercase();
    TOKEN_RULES.iter().find(|rule| lowered.contains(rule.pattern))
}

/// Canonical token list, one per rule, in priority order.
#[must_use]
pub fn known_tokens() -> Vec<String> {
    TOKEN_RULES
        .iter()
        .map(|rule| rule.pattern.to_string())
        .collect()
}

/// Resolves one token into one populated acquisition bucket.
pub struct CategoryResolver<'a> {
    locator: &'a dyn FileLocator,
    apps: AppLogEnumerator<'a>,
}

impl<'a> CategoryResolver<'a> {
    /// Build a resolver over the injected collaborators.
    #[must_use]
    pub fn new(
        locator: &'a dyn FileLocator,
        catalog: &'a dyn LogCatalog,
        journal_supported: bool,
    ) -> Self {
        Self {
            locator,
            apps: AppLogEnumerator::new(catalog, locator, journal_supported),
        }
    }

    /// Resolve a token to a bucket. Unrecognized tokens yield an empty
    /// bucket, which still occupies its slot in the plan.
    #[must_use]
    pub fn resolve(&self, token: &str) -> AcquisitionBucket {
        let Some(rule) = match_rule(token) else {
            tracing::warn!(token = token, "Unrecognized category token");
            return AcquisitionBucket::default();
        };

        let mut bucket = AcquisitionBucket::new(rule.category);
        match rule.kind {
            RuleKind::Commands(commands) => {
                bucket
                    .commands
                    .extend(commands.iter().map(|c| (*c).to_string()));
            }
            RuleKind::Locate { subsystem } => {
                bucket.files.extend(self.locator.locate(subsystem, false));
            }
            RuleKind::LiteralFile(path) => {
                bucket.files.push(path.into());
            }
            RuleKind::Applications => self.apps.expand_applications(&mut bucket),
            RuleKind::OtherLogs => self.apps.expand_other_logs(&mut bucket),
            RuleKind::CustomLogs => self.apps.expand_custom_logs(&mut bucket),
        }
        bucket
    }
}
