//! SQL schema for the warrant SQLite store.
//!
//! Executed once at connection startup. Every entity table carries a
//! nullable `deleted_at`; rows are soft-deleted and never removed.
//! Equivalence keys are backed by partial unique indexes over the
//! non-deleted rows, so a deleted entity never blocks re-creation.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ─── Propositions & speakers ───────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS propositions (
    proposition_id  TEXT PRIMARY KEY,
    text            TEXT NOT NULL,
    normal_text     TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    creator_user_id TEXT NOT NULL,
    deleted_at      TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS propositions_normal_text_uq
    ON propositions(normal_text) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS persorgs (
    persorg_id      TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    normal_name     TEXT NOT NULL,
    is_organization INTEGER NOT NULL DEFAULT 0,
    known_for       TEXT,
    website_url     TEXT,
    created_at      TEXT NOT NULL,
    creator_user_id TEXT NOT NULL,
    deleted_at      TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS persorgs_normal_name_uq
    ON persorgs(normal_name) WHERE deleted_at IS NULL;

-- A statement's sentence is a proposition or another statement.
CREATE TABLE IF NOT EXISTS statements (
    statement_id        TEXT PRIMARY KEY,
    sentence_type       TEXT NOT NULL,   -- 'PROPOSITION' | 'STATEMENT'
    sentence_id         TEXT NOT NULL,
    speaker_persorg_id  TEXT NOT NULL REFERENCES persorgs(persorg_id),
    root_proposition_id TEXT NOT NULL REFERENCES propositions(proposition_id),
    created_at          TEXT NOT NULL,
    creator_user_id     TEXT NOT NULL,
    deleted_at          TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS statements_key_uq
    ON statements(speaker_persorg_id, sentence_type, sentence_id) WHERE deleted_at IS NULL;

-- ─── Writs ─────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS writs (
    writ_id         TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    normal_title    TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    creator_user_id TEXT NOT NULL,
    deleted_at      TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS writs_normal_title_uq
    ON writs(normal_title) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS writ_quotes (
    writ_quote_id     TEXT PRIMARY KEY,
    writ_id           TEXT NOT NULL REFERENCES writs(writ_id),
    quote_text        TEXT NOT NULL,
    normal_quote_text TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    creator_user_id   TEXT NOT NULL,
    deleted_at        TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS writ_quotes_key_uq
    ON writ_quotes(writ_id, normal_quote_text) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS writ_quote_urls (
    writ_quote_id   TEXT NOT NULL REFERENCES writ_quotes(writ_quote_id),
    url_id          TEXT NOT NULL REFERENCES urls(url_id),
    created_at      TEXT NOT NULL,
    creator_user_id TEXT NOT NULL,
    PRIMARY KEY (writ_quote_id, url_id)
);

CREATE TABLE IF NOT EXISTS source_excerpt_paraphrases (
    source_excerpt_paraphrase_id TEXT PRIMARY KEY,
    paraphrasing_proposition_id  TEXT NOT NULL REFERENCES propositions(proposition_id),
    writ_quote_id                TEXT NOT NULL REFERENCES writ_quotes(writ_quote_id),
    created_at                   TEXT NOT NULL,
    creator_user_id              TEXT NOT NULL,
    deleted_at                   TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS source_excerpt_paraphrases_key_uq
    ON source_excerpt_paraphrases(paraphrasing_proposition_id, writ_quote_id)
    WHERE deleted_at IS NULL;

-- ─── Media excerpts ────────────────────────────────────────────────────────

-- host and canonical_host hold the lowercase ASCII (punycode) host of each
-- URL, so host lookups agree however the URL spelled it.
CREATE TABLE IF NOT EXISTS urls (
    url_id          TEXT PRIMARY KEY,
    url             TEXT NOT NULL,
    canonical_url   TEXT,
    host            TEXT,
    canonical_host  TEXT,
    created_at      TEXT NOT NULL,
    creator_user_id TEXT NOT NULL,
    deleted_at      TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS urls_url_uq ON urls(url) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS urls_canonical_idx ON urls(canonical_url);
CREATE INDEX IF NOT EXISTS urls_host_idx ON urls(host);
CREATE INDEX IF NOT EXISTS urls_canonical_host_idx ON urls(canonical_host);

CREATE TABLE IF NOT EXISTS sources (
    source_id          TEXT PRIMARY KEY,
    description        TEXT NOT NULL,
    normal_description TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    creator_user_id    TEXT NOT NULL,
    deleted_at         TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS sources_normal_description_uq
    ON sources(normal_description) WHERE deleted_at IS NULL;

-- Not unique on normal_quotation: equivalence also depends on locators and
-- citations.
CREATE TABLE IF NOT EXISTS media_excerpts (
    media_excerpt_id TEXT PRIMARY KEY,
    quotation        TEXT NOT NULL,
    normal_quotation TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    creator_user_id  TEXT NOT NULL,
    deleted_at       TEXT
);
CREATE INDEX IF NOT EXISTS media_excerpts_normal_quotation_idx
    ON media_excerpts(normal_quotation);

CREATE TABLE IF NOT EXISTS url_locators (
    url_locator_id   TEXT PRIMARY KEY,
    media_excerpt_id TEXT NOT NULL REFERENCES media_excerpts(media_excerpt_id),
    url_id           TEXT NOT NULL REFERENCES urls(url_id),
    anchors          TEXT NOT NULL DEFAULT '[]',   -- JSON, sorted DomAnchor list
    created_at       TEXT NOT NULL,
    creator_user_id  TEXT NOT NULL,
    deleted_at       TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS url_locators_key_uq
    ON url_locators(media_excerpt_id, url_id, anchors) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS citations (
    media_excerpt_id TEXT NOT NULL REFERENCES media_excerpts(media_excerpt_id),
    source_id        TEXT NOT NULL REFERENCES sources(source_id),
    pincite          TEXT,
    normal_pincite   TEXT,
    created_at       TEXT NOT NULL,
    creator_user_id  TEXT NOT NULL,
    deleted_at       TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS citations_key_uq
    ON citations(media_excerpt_id, source_id, COALESCE(normal_pincite, ''))
    WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS media_excerpt_speakers (
    media_excerpt_id TEXT NOT NULL REFERENCES media_excerpts(media_excerpt_id),
    persorg_id       TEXT NOT NULL REFERENCES persorgs(persorg_id),
    created_at       TEXT NOT NULL,
    creator_user_id  TEXT NOT NULL,
    deleted_at       TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS media_excerpt_speakers_uq
    ON media_excerpt_speakers(media_excerpt_id, persorg_id) WHERE deleted_at IS NULL;

-- ─── Justifications ────────────────────────────────────────────────────────

-- atoms_key is the ordered, comma-joined atom list; the equivalence key.
CREATE TABLE IF NOT EXISTS proposition_compounds (
    proposition_compound_id TEXT PRIMARY KEY,
    atoms_key               TEXT NOT NULL,
    created_at              TEXT NOT NULL,
    creator_user_id         TEXT NOT NULL,
    deleted_at              TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS proposition_compounds_key_uq
    ON proposition_compounds(atoms_key) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS proposition_compound_atoms (
    proposition_compound_id TEXT NOT NULL REFERENCES proposition_compounds(proposition_compound_id),
    position                INTEGER NOT NULL,
    proposition_id          TEXT NOT NULL REFERENCES propositions(proposition_id),
    PRIMARY KEY (proposition_compound_id, position)
);

CREATE TABLE IF NOT EXISTS justification_basis_compounds (
    justification_basis_compound_id TEXT PRIMARY KEY,
    atoms_key                       TEXT NOT NULL,
    created_at                      TEXT NOT NULL,
    creator_user_id                 TEXT NOT NULL,
    deleted_at                      TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS justification_basis_compounds_key_uq
    ON justification_basis_compounds(atoms_key) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS justification_basis_compound_atoms (
    justification_basis_compound_id TEXT NOT NULL
        REFERENCES justification_basis_compounds(justification_basis_compound_id),
    position                        INTEGER NOT NULL,
    entity_type                     TEXT NOT NULL,   -- 'PROPOSITION' | 'SOURCE_EXCERPT_PARAPHRASE'
    entity_id                       TEXT NOT NULL,
    PRIMARY KEY (justification_basis_compound_id, position)
);

CREATE TABLE IF NOT EXISTS justifications (
    justification_id TEXT PRIMARY KEY,
    target_type      TEXT NOT NULL,   -- 'PROPOSITION' | 'STATEMENT' | 'JUSTIFICATION'
    target_id        TEXT NOT NULL,
    basis_type       TEXT NOT NULL,
    basis_id         TEXT NOT NULL,
    polarity         TEXT NOT NULL,   -- 'POSITIVE' | 'NEGATIVE'
    root_target_type TEXT NOT NULL,   -- 'PROPOSITION' | 'STATEMENT'
    root_target_id   TEXT NOT NULL,
    root_polarity    TEXT NOT NULL,
    score            INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    creator_user_id  TEXT NOT NULL,
    deleted_at       TEXT,
    CHECK (target_type != 'JUSTIFICATION' OR polarity = 'NEGATIVE')
);
CREATE UNIQUE INDEX IF NOT EXISTS justifications_key_uq
    ON justifications(target_type, target_id, basis_type, basis_id, polarity)
    WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS justifications_root_idx
    ON justifications(root_target_type, root_target_id);
CREATE INDEX IF NOT EXISTS justifications_target_idx
    ON justifications(target_type, target_id);

-- ─── Votes ─────────────────────────────────────────────────────────────────

-- At most one live vote per user and target: an opposing vote is
-- soft-deleted before the new one is recorded.
CREATE TABLE IF NOT EXISTS votes (
    vote_id     TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    target_type TEXT NOT NULL,
    target_id   TEXT NOT NULL,
    polarity    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    deleted_at  TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS votes_live_uq
    ON votes(user_id, target_type, target_id) WHERE deleted_at IS NULL;

-- ─── Full-text search ──────────────────────────────────────────────────────
--
-- External-content FTS5 tables over each searchable column, kept in sync by
-- triggers. Soft deletion does not touch the index; searches join back to
-- the base table and filter there.

CREATE VIRTUAL TABLE IF NOT EXISTS propositions_fts USING fts5(
    text, content='propositions', content_rowid='rowid',
    tokenize='porter unicode61 remove_diacritics 2'
);
CREATE TRIGGER IF NOT EXISTS propositions_fts_ai AFTER INSERT ON propositions BEGIN
    INSERT INTO propositions_fts(rowid, text) VALUES (new.rowid, new.text);
END;
CREATE TRIGGER IF NOT EXISTS propositions_fts_au AFTER UPDATE OF text ON propositions BEGIN
    INSERT INTO propositions_fts(propositions_fts, rowid, text) VALUES ('delete', old.rowid, old.text);
    INSERT INTO propositions_fts(rowid, text) VALUES (new.rowid, new.text);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS media_excerpts_fts USING fts5(
    quotation, content='media_excerpts', content_rowid='rowid',
    tokenize='porter unicode61 remove_diacritics 2'
);
CREATE TRIGGER IF NOT EXISTS media_excerpts_fts_ai AFTER INSERT ON media_excerpts BEGIN
    INSERT INTO media_excerpts_fts(rowid, quotation) VALUES (new.rowid, new.quotation);
END;
CREATE TRIGGER IF NOT EXISTS media_excerpts_fts_au AFTER UPDATE OF quotation ON media_excerpts BEGIN
    INSERT INTO media_excerpts_fts(media_excerpts_fts, rowid, quotation)
        VALUES ('delete', old.rowid, old.quotation);
    INSERT INTO media_excerpts_fts(rowid, quotation) VALUES (new.rowid, new.quotation);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS sources_fts USING fts5(
    description, content='sources', content_rowid='rowid',
    tokenize='porter unicode61 remove_diacritics 2'
);
CREATE TRIGGER IF NOT EXISTS sources_fts_ai AFTER INSERT ON sources BEGIN
    INSERT INTO sources_fts(rowid, description) VALUES (new.rowid, new.description);
END;
CREATE TRIGGER IF NOT EXISTS sources_fts_au AFTER UPDATE OF description ON sources BEGIN
    INSERT INTO sources_fts(sources_fts, rowid, description)
        VALUES ('delete', old.rowid, old.description);
    INSERT INTO sources_fts(rowid, description) VALUES (new.rowid, new.description);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS persorgs_fts USING fts5(
    name, content='persorgs', content_rowid='rowid',
    tokenize='porter unicode61 remove_diacritics 2'
);
CREATE TRIGGER IF NOT EXISTS persorgs_fts_ai AFTER INSERT ON persorgs BEGIN
    INSERT INTO persorgs_fts(rowid, name) VALUES (new.rowid, new.name);
END;
CREATE TRIGGER IF NOT EXISTS persorgs_fts_au AFTER UPDATE OF name ON persorgs BEGIN
    INSERT INTO persorgs_fts(persorgs_fts, rowid, name) VALUES ('delete', old.rowid, old.name);
    INSERT INTO persorgs_fts(rowid, name) VALUES (new.rowid, new.name);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS writs_fts USING fts5(
    title, content='writs', content_rowid='rowid',
    tokenize='porter unicode61 remove_diacritics 2'
);
CREATE TRIGGER IF NOT EXISTS writs_fts_ai AFTER INSERT ON writs BEGIN
    INSERT INTO writs_fts(rowid, title) VALUES (new.rowid, new.title);
END;
CREATE TRIGGER IF NOT EXISTS writs_fts_au AFTER UPDATE OF title ON writs BEGIN
    INSERT INTO writs_fts(writs_fts, rowid, title) VALUES ('delete', old.rowid, old.title);
    INSERT INTO writs_fts(rowid, title) VALUES (new.rowid, new.title);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS writ_quotes_fts USING fts5(
    quote_text, content='writ_quotes', content_rowid='rowid',
    tokenize='porter unicode61 remove_diacritics 2'
);
CREATE TRIGGER IF NOT EXISTS writ_quotes_fts_ai AFTER INSERT ON writ_quotes BEGIN
    INSERT INTO writ_quotes_fts(rowid, quote_text) VALUES (new.rowid, new.quote_text);
END;
CREATE TRIGGER IF NOT EXISTS writ_quotes_fts_au AFTER UPDATE OF quote_text ON writ_quotes BEGIN
    INSERT INTO writ_quotes_fts(writ_quotes_fts, rowid, quote_text)
        VALUES ('delete', old.rowid, old.quote_text);
    INSERT INTO writ_quotes_fts(rowid, quote_text) VALUES (new.rowid, new.quote_text);
END;

PRAGMA user_version = 1;
";
