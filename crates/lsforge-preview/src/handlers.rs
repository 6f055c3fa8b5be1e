use std::path::Path;

/// The preview handler families — one per class of file the engine can
/// describe.
///
/// Dispatch is a static match over this sum, not a trait-object lookup.
/// The registry maps extensions onto handlers; anything beyond extension
/// dispatch (content sniffing, conversion) happens *inside* the handler
/// implementations in [`crate::engine`].
///
/// ```text
/// ┌────────────┬──────────────────────────┬─────────────────┐
/// │ Handler    │ Extensions               │ Needs converter │
/// ├────────────┼──────────────────────────┼─────────────────┤
/// │ Textual    │ .lsx .xml                │ no              │
/// │ Json       │ .lsj .json               │ no              │
/// │ BinaryTree │ .lsf .lsfx .lsbs .lsbc   │ yes             │
/// │ Texture    │ .dds                     │ no              │
/// │ Model      │ .gr2                     │ no              │
/// │ Shader     │ .bshd .shd               │ no              │
/// │ Loca       │ .loca                    │ yes             │
/// │ PlainText  │ .txt                     │ no              │
/// └────────────┴──────────────────────────┴─────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    Textual,
    Json,
    BinaryTree,
    Texture,
    Model,
    Shader,
    Loca,
    PlainText,
}

/// What a handler can do and what it requires.
#[derive(Clone, Copy, Debug)]
pub struct HandlerCapabilities {
    pub extensions: &'static [&'static str],
    pub needs_converter: bool,
}

const ALL_HANDLERS: [Handler; 8] = [
    Handler::Textual,
    Handler::Json,
    Handler::BinaryTree,
    Handler::Texture,
    Handler::Model,
    Handler::Shader,
    Handler::Loca,
    Handler::PlainText,
];

impl Handler {
    #[must_use]
    pub fn capabilities(self) -> HandlerCapabilities {
        match self {
            Self::Textual => HandlerCapabilities {
                extensions: &["lsx", "xml"],
                needs_converter: false,
            },
            Self::Json => HandlerCapabilities {
                extensions: &["lsj", "json"],
                needs_converter: false,
            },
            Self::BinaryTree => HandlerCapabilities {
                extensions: &["lsf", "lsfx", "lsbs", "lsbc"],
                needs_converter: true,
            },
            Self::Texture => HandlerCapabilities {
                extensions: &["dds"],
                needs_converter: false,
            },
            Self::Model => HandlerCapabilities {
                extensions: &["gr2"],
                needs_converter: false,
            },
            Self::Shader => HandlerCapabilities {
                extensions: &["bshd", "shd"],
                needs_converter: false,
            },
            Self::Loca => HandlerCapabilities {
                extensions: &["loca"],
                needs_converter: true,
            },
            Self::PlainText => HandlerCapabilities {
                extensions: &["txt"],
                needs_converter: false,
            },
        }
    }
}

/// Extension → handler dispatch table.
pub struct HandlerRegistry;

impl HandlerRegistry {
    /// Select a handler for a file, by extension only.
    #[must_use]
    pub fn get_handler_for_file(path: &Path) -> Option<Handler> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        ALL_HANDLERS
            .into_iter()
            .find(|h| h.capabilities().extensions.contains(&ext.as_str()))
    }

    /// Every supported extension, dot-prefixed and sorted.
    #[must_use]
    pub fn supported_extensions() -> Vec<String> {
        let mut extensions: Vec<String> = ALL_HANDLERS
            .into_iter()
            .flat_map(|h| h.capabilities().extensions.iter().map(|e| format!(".{e}")))
            .collect();
        extensions.sort();
        extensions
    }

    #[must_use]
    pub fn is_supported(path: &Path) -> bool {
        Self::get_handler_for_file(path).is_some()
    }
}
