//! Text of `tagmod manual`.

pub(crate) const MANUAL: &str = r#"TAGMOD RULE FILES
=================

A rule file holds one rule per line. Blank lines and lines starting with '#'
are ignored. Keywords are case-sensitive and written in capitals.

ACTIONS
-------
  key=value                Overwrite <key> if the way has it; otherwise do nothing.
                           ('==' is only valid inside conditions.)
  key+=n   key-=n          Add to / subtract from a numeric tag. Ways without
                           the tag are left alone; non-numeric values are
                           reported as warnings and left alone.
  ADD key=value            Create <key> if the way does not have it yet.
  REMOVE key               Delete every tag named <key>.
  UPDATE key TO value      Set <key>, creating it when missing. Values may
                           contain spaces: UPDATE NAME TO Main Street
  DONOTHING                No change. Handy as an ELSE branch.

Actions combine with AND and OR; AND binds tighter, parentheses group:
  REMOVE A AND ADD B=1          run both
  A=1 OR ADD A=1                run the right side only if the left changed nothing
  (LANES+=1 OR ADD LANES=1) AND UPDATE CHECKED TO yes

CONDITIONAL RULES
-----------------
  IF <condition> [AND|OR <condition> ...] THEN <actions> [ELSE <actions>]

Conditions:
  EXISTS key               the way has exactly one tag named <key>
  NOTEXISTS key            the way has no tag named <key>
  key OP value             OP is one of == != > < >= <=

A comparison on a missing key is false. Numbers compare numerically
(30 == 30.0). Text supports only == and !=; ordering text stops the run
with an error. Conditions are a flat chain without parentheses, AND
before OR.

  IF LANES>1 AND NOTEXISTS HEIGHT THEN ADD HEIGHT=5 ELSE UPDATE LANES TO 2

FREQUENCY
---------
Any rule may end with FREQ <numerator>/<denominator>. Each way gets its own
random draw, so the rule applies to roughly that share of ways:

  UPDATE MAXSPEED TO 50 FREQ 1/2

The ratio must lie in (0, 1]. Use --seed or [run] seed for repeatable runs.

ERRORS
------
Any malformed line aborts loading with its line number; no rule is
applied and no output file is written.
"#;
