macro_rules! dispatch_backend {
    ($type:ident: $backend:expr => $expr:expr) => {{
        use crate::backend::{Backend, Js, C};

        match $backend {
            Backend::C => {
                type $type<'target> = C<'target>;
                $expr
            }

            Backend::Js => {
                type $type<'target> = Js<'target>;
                $expr
            }
        }
    }};
}

macro_rules! emit {
    ($context:expr, $($format:tt)*) => {{
        $context.indent()?;
        writeln!($context.output(), $($format)*)
    }};
}
