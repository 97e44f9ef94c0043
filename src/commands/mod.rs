// src/commands/mod.rs
pub mod awk;
pub mod base64_cmd;
pub mod basename;
pub mod bash_cmd;
pub mod cat;
pub mod chmod;
pub mod clear_cmd;
pub mod column_cmd;
pub mod comm_cmd;
pub mod cp;
pub mod curl;
pub mod cut;
pub mod date;
pub mod diff_cmd;
pub mod dirname;
pub mod du_cmd;
pub mod env;
pub mod expand_cmd;
pub mod expr_cmd;
pub mod file_cmd;
pub mod find;
pub mod fold_cmd;
pub mod grep;
pub mod gzip;
pub mod head;
pub mod help_cmd;
pub mod hostname_cmd;
pub mod html_to_markdown_cmd;
pub mod join;
pub mod jq;
pub mod ln;
pub mod ls;
pub mod md5sum;
pub mod mkdir;
pub mod mv;
pub mod nl;
pub mod od_cmd;
pub mod paste;
pub mod printf;
pub mod pwd;
pub mod query_engine;
pub mod readlink_cmd;
pub mod registry;
pub mod rev_cmd;
pub mod rg_cmd;
pub mod rm;
pub mod rmdir_cmd;
pub mod sed;
pub mod seq;
pub mod sleep_cmd;
pub mod sort;
pub mod split_cmd;
pub mod stat_cmd;
pub mod strings_cmd;
pub mod tac_cmd;
pub mod tail;
pub mod tar;
pub mod tee;
pub mod test_cmd;
pub mod time_cmd;
pub mod timeout_cmd;
pub mod touch;
pub mod tr;
pub mod tree_cmd;
pub mod true_cmd;
pub mod types;
pub mod uniq;
pub mod utils;
pub mod wc;
pub mod which_cmd;
pub mod whoami_cmd;
pub mod xan_cmd;
pub mod xargs;
pub mod yq;

pub use registry::CommandRegistry;
pub use types::{Command, CommandContext, CommandResult};

/// Build the registry of external (non-builtin) commands wired into the
/// interpreter's command-resolution fallback. Every coreutils-style
/// reimplementation the interpreter can dispatch to without forking a real
/// process is registered here under its canonical name; aliases (e.g.
/// `.`/`source`, `[` ) are handled by the interpreter's own builtin
/// dispatch and are intentionally not duplicated here.
pub fn default_registry() -> CommandRegistry {
    let mut reg = CommandRegistry::new();

    reg.register(Box::new(awk::AwkCommand));
    reg.register(Box::new(base64_cmd::Base64Command));
    reg.register(Box::new(basename::BasenameCommand));
    reg.register(Box::new(bash_cmd::BashCommand));
    reg.register(Box::new(bash_cmd::ShCommand));
    reg.register(Box::new(cat::CatCommand));
    reg.register(Box::new(chmod::ChmodCommand));
    reg.register(Box::new(clear_cmd::ClearCommand));
    reg.register(Box::new(column_cmd::ColumnCommand));
    reg.register(Box::new(comm_cmd::CommCommand));
    reg.register(Box::new(cp::CpCommand));
    reg.register(Box::new(curl::CurlCommand));
    reg.register(Box::new(cut::CutCommand));
    reg.register(Box::new(date::DateCommand));
    reg.register(Box::new(diff_cmd::DiffCommand));
    reg.register(Box::new(dirname::DirnameCommand));
    reg.register(Box::new(du_cmd::DuCommand));
    reg.register(Box::new(env::EnvCommand));
    reg.register(Box::new(env::PrintenvCommand));
    reg.register(Box::new(expand_cmd::ExpandCommand));
    reg.register(Box::new(expr_cmd::ExprCommand));
    reg.register(Box::new(file_cmd::FileCommand));
    reg.register(Box::new(find::FindCommand));
    reg.register(Box::new(fold_cmd::FoldCommand));
    reg.register(Box::new(grep::GrepCommand));
    reg.register(Box::new(gzip::GzipCommand));
    reg.register(Box::new(gzip::GunzipCommand));
    reg.register(Box::new(gzip::ZcatCommand));
    reg.register(Box::new(head::HeadCommand));
    reg.register(Box::new(help_cmd::HelpCommand));
    reg.register(Box::new(hostname_cmd::HostnameCommand));
    reg.register(Box::new(html_to_markdown_cmd::HtmlToMarkdownCommand));
    reg.register(Box::new(join::JoinCommand));
    reg.register(Box::new(jq::JqCommand));
    reg.register(Box::new(ln::LnCommand));
    reg.register(Box::new(ls::LsCommand));
    reg.register(Box::new(md5sum::Md5sumCommand));
    reg.register(Box::new(md5sum::Sha1sumCommand));
    reg.register(Box::new(md5sum::Sha256sumCommand));
    reg.register(Box::new(mkdir::MkdirCommand));
    reg.register(Box::new(mv::MvCommand));
    reg.register(Box::new(nl::NlCommand));
    reg.register(Box::new(od_cmd::OdCommand));
    reg.register(Box::new(paste::PasteCommand));
    reg.register(Box::new(printf::PrintfCommand));
    reg.register(Box::new(pwd::PwdCommand));
    reg.register(Box::new(readlink_cmd::ReadlinkCommand));
    reg.register(Box::new(rev_cmd::RevCommand));
    reg.register(Box::new(rg_cmd::RgCommand));
    reg.register(Box::new(rm::RmCommand));
    reg.register(Box::new(rmdir_cmd::RmdirCommand));
    reg.register(Box::new(sed::SedCommand));
    reg.register(Box::new(seq::SeqCommand));
    reg.register(Box::new(sleep_cmd::SleepCommand));
    reg.register(Box::new(sort::SortCommand));
    reg.register(Box::new(split_cmd::SplitCommand));
    reg.register(Box::new(stat_cmd::StatCommand));
    reg.register(Box::new(strings_cmd::StringsCommand));
    reg.register(Box::new(tac_cmd::TacCommand));
    reg.register(Box::new(tail::TailCommand));
    reg.register(Box::new(tar::TarCommand));
    reg.register(Box::new(tee::TeeCommand));
    reg.register(Box::new(test_cmd::TestCommand));
    reg.register(Box::new(test_cmd::BracketCommand));
    reg.register(Box::new(time_cmd::TimeCommand));
    reg.register(Box::new(timeout_cmd::TimeoutCommand));
    reg.register(Box::new(touch::TouchCommand));
    reg.register(Box::new(tr::TrCommand));
    reg.register(Box::new(tree_cmd::TreeCommand));
    reg.register(Box::new(true_cmd::TrueCommand));
    reg.register(Box::new(true_cmd::FalseCommand));
    reg.register(Box::new(uniq::UniqCommand));
    reg.register(Box::new(wc::WcCommand));
    reg.register(Box::new(which_cmd::WhichCommand));
    reg.register(Box::new(whoami_cmd::WhoamiCommand));
    reg.register(Box::new(xan_cmd::XanCommand));
    reg.register(Box::new(xargs::XargsCommand));
    reg.register(Box::new(yq::YqCommand));

    reg
}
